//! Section locator tables, one per page type.
//!
//! Extraction walks these tables instead of branching on inline selectors,
//! so a new markup variant means a new table value, not a new code path.

/// Locators for recipe pages.
#[derive(Debug, Clone)]
pub struct RecipeRules {
    /// Ingredient full-name field nodes, anywhere on the page.
    pub ingredient_field: String,
    /// Content sections that may hold the preparation steps.
    pub content_sections: String,
    /// Section heading element.
    pub section_heading: String,
    /// Case-insensitive needle identifying the instructions section heading.
    pub instructions_heading: String,
    /// One step entry inside the instructions section.
    pub step_item: String,
    /// Step-number marker within a step entry.
    pub step_number: String,
    /// Step body text within a step entry.
    pub step_text: String,
    /// Columns of the instructions section that may carry tips.
    pub tips_column: String,
    /// Tips sub-heading element and its case-insensitive needle.
    pub tips_heading: String,
    pub tips_heading_contains: String,
    /// Tip paragraphs under the matched column.
    pub tip_paragraph: String,
}

impl RecipeRules {
    pub fn default_site() -> Self {
        Self {
            ingredient_field: r#"div[class*="field--name-field-ingredient-fullname"]"#.into(),
            content_sections: r#"div[class*="recipe__content-box"]"#.into(),
            section_heading: "h2".into(),
            instructions_heading: "how to prepare".into(),
            step_item: "article".into(),
            step_number: "span.step-number".into(),
            step_text: "p.coh-paragraph".into(),
            tips_column: "div.coh-column.content-half".into(),
            tips_heading: "h3".into(),
            tips_heading_contains: "tips".into(),
            tip_paragraph: "p.coh-paragraph".into(),
        }
    }
}

/// Locators for article pages.
#[derive(Debug, Clone)]
pub struct ArticleRules {
    /// Known body container, tried first.
    pub preferred_container: String,
    /// Scope searched when the preferred container is absent.
    pub candidate_scope: String,
    /// Candidate containers within the scope; largest text wins, ties to
    /// the first.
    pub candidate_container: String,
    /// Text blocks collected from the chosen container.
    pub blocks: String,
}

impl ArticleRules {
    pub fn default_site() -> Self {
        Self {
            preferred_container: "div.article-body".into(),
            candidate_scope: "article".into(),
            candidate_container: "div.coh-container".into(),
            blocks: "p, li".into(),
        }
    }
}

/// Locators for product pages.
#[derive(Debug, Clone)]
pub struct ProductRules {
    /// Labeled description field; first paragraph after the title is the
    /// fallback.
    pub description_field: String,
    /// Heading elements scanned for the features / ingredients sections.
    pub headings: String,
    /// Case-insensitive needle for the features heading.
    pub features_heading: String,
    /// Feature items under the matched heading's section.
    pub feature_items: String,
    /// The "Nutrition" tab control and its text fallback.
    pub nutrition_tab: String,
    pub nutrition_tab_texts: Vec<String>,
    /// Nutrient table structure.
    pub nutrition_container: String,
    pub nutrition_row: String,
    pub nutrition_label: String,
    pub nutrition_amount: String,
    pub nutrition_percent: String,
    /// The "Ingredients" tab control and its text fallback.
    pub ingredients_tab: String,
    pub ingredients_tab_texts: Vec<String>,
    /// Case-insensitive needle for the ingredients heading.
    pub ingredients_heading: String,
    /// Generic control selector used for text-located tabs.
    pub tab_controls: String,
}

impl ProductRules {
    pub fn default_site() -> Self {
        Self {
            description_field: r#"div[class*="field--name-field-description"]"#.into(),
            headings: "h2, h3".into(),
            features_heading: "feature".into(),
            feature_items: "li".into(),
            nutrition_tab: r##"a[href="#nutrition"], [data-tab="nutrition"]"##.into(),
            nutrition_tab_texts: vec!["nutrition".into()],
            nutrition_container: r#"div[class*="nutrients"], table[class*="nutrition"]"#.into(),
            nutrition_row: r#"tr, div[class*="nutrient-row"]"#.into(),
            nutrition_label: r#"th, td:nth-child(1), [class*="label"]"#.into(),
            nutrition_amount: r#"td:nth-child(2), [class*="amount"]"#.into(),
            nutrition_percent: r#"td:nth-child(3), [class*="percent"]"#.into(),
            ingredients_tab: r##"a[href="#ingredients"], [data-tab="ingredients"]"##.into(),
            ingredients_tab_texts: vec!["ingredients".into()],
            ingredients_heading: "ingredients".into(),
            tab_controls: "a, button".into(),
        }
    }
}
