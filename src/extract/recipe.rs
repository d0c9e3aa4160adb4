//! Recipe page extraction.

use super::rules::RecipeRules;
use super::{
    first_paragraph_after_title, join_sections, labeled, node_text, page_title, HarvestRecord,
    PageKind,
};
use scraper::{ElementRef, Html, Selector};

/// The sections a recipe page may carry. All optional.
#[derive(Debug, Clone, Default)]
pub struct RecipePage {
    pub url: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    /// Already formatted `"{n}. {text}"` lines.
    pub instructions: Vec<String>,
    pub tips: Vec<String>,
}

impl RecipePage {
    pub fn into_record(self) -> HarvestRecord {
        let content = join_sections(&[
            self.description,
            labeled("Ingredients", &self.ingredients.join("\n")),
            labeled("Instructions", &self.instructions.join("\n")),
            labeled("Tips", &self.tips.join("\n")),
        ]);
        HarvestRecord {
            url: self.url,
            kind: PageKind::Recipe,
            title: self.title,
            content,
        }
    }
}

/// Extract a recipe from rendered markup. Total: missing sections are
/// simply absent from the result.
pub fn extract_recipe(html: &str, url: &str, rules: &RecipeRules) -> RecipePage {
    let doc = Html::parse_document(html);

    let mut page = RecipePage {
        url: url.to_string(),
        title: page_title(&doc),
        description: first_paragraph_after_title(&doc).unwrap_or_default(),
        ..RecipePage::default()
    };

    if let Ok(sel) = Selector::parse(&rules.ingredient_field) {
        for field in doc.select(&sel) {
            let text = node_text(field);
            if !text.is_empty() {
                page.ingredients.push(text);
            }
        }
    }

    if let Some(section) = instructions_section(&doc, rules) {
        page.instructions = collect_steps(section, rules);
        page.tips = collect_tips(section, rules);
    }

    page
}

/// The content section whose heading mentions the preparation needle.
fn instructions_section<'a>(doc: &'a Html, rules: &RecipeRules) -> Option<ElementRef<'a>> {
    let sections = Selector::parse(&rules.content_sections).ok()?;
    let heading = Selector::parse(&rules.section_heading).ok()?;
    let needle = rules.instructions_heading.to_lowercase();

    doc.select(&sections).find(|section| {
        section
            .select(&heading)
            .any(|h| node_text(h).to_lowercase().contains(&needle))
    })
}

/// `"{n}. {text}"` for every step entry carrying both marker and body.
fn collect_steps(section: ElementRef<'_>, rules: &RecipeRules) -> Vec<String> {
    let (Ok(item_sel), Ok(num_sel), Ok(text_sel)) = (
        Selector::parse(&rules.step_item),
        Selector::parse(&rules.step_number),
        Selector::parse(&rules.step_text),
    ) else {
        return Vec::new();
    };

    let mut steps = Vec::new();
    for item in section.select(&item_sel) {
        let number = item.select(&num_sel).next().map(node_text);
        let text = item.select(&text_sel).next().map(node_text);
        if let (Some(number), Some(text)) = (number, text) {
            if !number.is_empty() && !text.is_empty() {
                steps.push(format!("{number}. {text}"));
            }
        }
    }
    steps
}

/// Tip paragraphs from the column whose sub-heading mentions tips.
fn collect_tips(section: ElementRef<'_>, rules: &RecipeRules) -> Vec<String> {
    let (Ok(col_sel), Ok(head_sel), Ok(para_sel)) = (
        Selector::parse(&rules.tips_column),
        Selector::parse(&rules.tips_heading),
        Selector::parse(&rules.tip_paragraph),
    ) else {
        return Vec::new();
    };
    let needle = rules.tips_heading_contains.to_lowercase();

    for col in section.select(&col_sel) {
        let has_tips_heading = col
            .select(&head_sel)
            .any(|h| node_text(h).to_lowercase().contains(&needle));
        if !has_tips_heading {
            continue;
        }
        return col
            .select(&para_sel)
            .map(node_text)
            .filter(|t| !t.is_empty())
            .collect();
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RecipeRules {
        RecipeRules::default_site()
    }

    const FULL_RECIPE: &str = r#"
        <html><body>
        <h1> Molten Lava Cake </h1>
        <p>A dessert that erupts on cue.</p>
        <div class="field--name-field-ingredient-fullname">200 g dark chocolate</div>
        <div class="field--name-field-ingredient-fullname">3 eggs</div>
        <div class="recipe__content-box extra">
            <h2>How to Prepare</h2>
            <article>
                <span class="step-number coh-inline-element">1</span>
                <p class="coh-paragraph">Mix</p>
            </article>
            <article>
                <span class="step-number coh-inline-element">2</span>
                <p class="coh-paragraph">Bake</p>
            </article>
            <div class="coh-column content-half coh-col-xl">
                <h3>Chef tips</h3>
                <p class="coh-paragraph">Serve warm.</p>
            </div>
        </div>
        </body></html>
    "#;

    #[test]
    fn extracts_all_sections() {
        let page = extract_recipe(FULL_RECIPE, "https://x.ca/recipe/lava", &rules());
        assert_eq!(page.title, "Molten Lava Cake");
        assert_eq!(page.description, "A dessert that erupts on cue.");
        assert_eq!(page.ingredients, vec!["200 g dark chocolate", "3 eggs"]);
        assert_eq!(page.instructions, vec!["1. Mix", "2. Bake"]);
        assert_eq!(page.tips, vec!["Serve warm."]);
    }

    #[test]
    fn instructions_join_into_numbered_lines() {
        let page = extract_recipe(FULL_RECIPE, "https://x.ca/recipe/lava", &rules());
        let record = page.into_record();
        assert!(record.content.contains("Instructions:\n1. Mix\n2. Bake"));
    }

    #[test]
    fn missing_tips_section_is_omitted() {
        let html = r#"
            <h1>Plain</h1>
            <div class="recipe__content-box">
                <h2>HOW TO PREPARE</h2>
                <article>
                    <span class="step-number">1</span>
                    <p class="coh-paragraph">Stir</p>
                </article>
            </div>
        "#;
        let page = extract_recipe(html, "https://x.ca/recipe/plain", &rules());
        assert_eq!(page.instructions, vec!["1. Stir"]);
        assert!(page.tips.is_empty());
        let record = page.into_record();
        assert!(!record.content.contains("Tips:"));
    }

    #[test]
    fn steps_without_markers_are_dropped() {
        let html = r#"
            <h1>Odd</h1>
            <div class="recipe__content-box">
                <h2>How to prepare</h2>
                <article><p class="coh-paragraph">No number here</p></article>
                <article>
                    <span class="step-number">1</span>
                    <p class="coh-paragraph">Counted</p>
                </article>
            </div>
        "#;
        let page = extract_recipe(html, "https://x.ca/recipe/odd", &rules());
        assert_eq!(page.instructions, vec!["1. Counted"]);
    }

    #[test]
    fn bare_page_yields_empty_content() {
        let page = extract_recipe("<html><body></body></html>", "https://x.ca/r", &rules());
        let record = page.into_record();
        assert_eq!(record.title, "");
        assert_eq!(record.content, "");
    }
}
