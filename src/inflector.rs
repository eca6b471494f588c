//! English naming conventions used to guess entity kinds from file names and
//! format tokens.

use convert_case::{Case, Casing};

/// (singular, plural) pairs that do not follow the suffix rules.
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
    ("leaf", "leaves"),
    ("life", "lives"),
];

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "information",
    "metadata",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
];

/// Applies `inflect` to the last `_`-separated segment of `word`, so
/// `blog_post` pluralizes to `blog_posts`.
fn on_last_segment(word: &str, inflect: fn(&str) -> String) -> String {
    match word.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", inflect(last)),
        None => inflect(word),
    }
}

/// Re-applies the capitalization of `original` to a lowercase inflection.
fn match_case(original: &str, inflected: String) -> String {
    let mut chars = original.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            if chars.clone().count() > 0 && chars.all(char::is_uppercase) {
                return inflected.to_uppercase();
            }
            let mut out = inflected;
            if let Some(head) = out.get(..1) {
                let upper = head.to_uppercase();
                out.replace_range(..1, &upper);
            }
            out
        }
        _ => inflected,
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn pluralize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == lower) {
        return match_case(word, plural.to_string());
    }
    if IRREGULAR.iter().any(|(_, p)| *p == lower) {
        return word.to_string();
    }

    let plural = if let Some(stem) = lower.strip_suffix('y') {
        match stem.chars().last() {
            Some(c) if !is_vowel(c) => format!("{stem}ies"),
            _ => format!("{lower}s"),
        }
    } else if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        format!("{lower}es")
    } else {
        format!("{lower}s")
    };
    match_case(word, plural)
}

fn singularize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, p)| *p == lower) {
        return match_case(word, singular.to_string());
    }
    if IRREGULAR.iter().any(|(s, _)| *s == lower) {
        return word.to_string();
    }

    let singular = if let Some(stem) = lower.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = ["sses", "xes", "zes", "ches", "shes"]
        .iter()
        .find_map(|suffix| lower.strip_suffix(suffix).map(|stem| (stem, suffix)))
        .map(|(stem, suffix)| format!("{stem}{}", &suffix[..suffix.len() - 2]))
    {
        stem
    } else if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        lower
    } else if let Some(stem) = lower.strip_suffix('s') {
        stem.to_string()
    } else {
        lower
    };
    match_case(word, singular)
}

pub fn pluralize(word: &str) -> String {
    on_last_segment(word, pluralize_word)
}

pub fn singularize(word: &str) -> String {
    on_last_segment(word, singularize_word)
}

/// `ThumbnailUrl` → `thumbnail_url`.
pub fn tableize(word: &str) -> String {
    word.to_case(Case::Snake)
}

/// Singular PascalCase class name for a table or collection token:
/// `people` → `Person`, `blog_posts` → `BlogPost`.
pub fn classify(word: &str) -> String {
    singularize(&tableize(word)).to_case(Case::Pascal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_plurals() {
        assert_eq!(pluralize("clip"), "clips");
        assert_eq!(pluralize("episode"), "episodes");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("match"), "matches");
    }

    #[test]
    fn irregular_and_uncountable() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("people"), "people");
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("children"), "child");
        assert_eq!(pluralize("news"), "news");
        assert_eq!(singularize("series"), "series");
    }

    #[test]
    fn singulars() {
        assert_eq!(singularize("clips"), "clip");
        assert_eq!(singularize("episodes"), "episode");
        assert_eq!(singularize("tags"), "tag");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("classes"), "class");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("person"), "person");
    }

    #[test]
    fn compound_words_inflect_last_segment() {
        assert_eq!(pluralize("blog_person"), "blog_people");
        assert_eq!(singularize("blog_posts"), "blog_post");
    }

    #[test]
    fn table_and_class_names() {
        assert_eq!(tableize("Person"), "person");
        assert_eq!(tableize("ThumbnailUrl"), "thumbnail_url");
        assert_eq!(classify("people"), "Person");
        assert_eq!(classify("person"), "Person");
        assert_eq!(classify("blog_posts"), "BlogPost");
        assert_eq!(classify("Clip"), "Clip");
    }
}
