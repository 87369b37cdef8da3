//! Built-in ingestion corpus
//!
//! A fixed set of Polish sauce recipes with stable ids. The corpus is static
//! and externally supplied; ids are never reused.

use crate::Document;

/// The built-in recipe corpus loaded at startup.
pub fn sample_recipes() -> Vec<Document> {
    vec![
        Document::new(
            "doc1",
            "Sos czosnkowy (garlic sauce): Combine a cup of thick yogurt with \
             three crushed garlic cloves, a tablespoon of mayonnaise, chopped \
             dill, a pinch of salt, and a squeeze of lemon juice. Rest it in \
             the fridge for an hour so the garlic mellows. A classic cold \
             sauce for kebabs, grilled meats, and fresh bread.",
        ),
        Document::new(
            "doc2",
            "Sos koperkowy (dill sauce): Melt two tablespoons of butter, stir \
             in flour to make a light roux, then whisk in a cup of vegetable \
             stock and half a cup of cream. Add a generous handful of chopped \
             fresh dill and simmer gently. This delicate warm sauce is the \
             traditional partner for poached or baked fish and young potatoes.",
        ),
        Document::new(
            "doc3",
            "Sos pomidorowy (tomato sauce): Sweat a finely diced onion in \
             olive oil, add two cloves of garlic, then a can of crushed \
             tomatoes, a teaspoon of sugar, salt, pepper, and a bay leaf. \
             Simmer for twenty minutes until thick. Toss with pasta, spoon \
             over gołąbki, or use as a base for meatballs.",
        ),
        Document::new(
            "doc4",
            "Sos barbecue (grill sauce): Simmer ketchup with apple cider \
             vinegar, brown sugar, smoked paprika, mustard, and a dash of \
             Worcestershire sauce until glossy. Brush it over ribs, sausages, \
             or chicken during the last minutes on the grill. Sharp, smoky \
             sauces like this one are ideal for barbecue season.",
        ),
        Document::new(
            "doc5",
            "Sos grzybowy (mushroom sauce): Fry sliced forest mushrooms with \
             onion in butter until golden, deglaze with a splash of white \
             wine, then add cream and reduce. Season with salt, pepper, and \
             thyme. Served over potato dumplings, kotlet schabowy, or roast \
             poultry.",
        ),
    ]
}
