//! The fixed Spanish prompt catalogue.
//!
//! Bodies use `{phrase}`, `{a}`, `{b}`, `{x}`, `{article}` and `{mask}` placeholders;
//! the family's begin and end tokens are added around every rendered body.

use crate::{
    error::{PromptOreError, Result},
    nlp::{family::ModelFamily, markers::MarkedPhrase},
};

/// Entity counts the catalogue has templates for.
pub const SUPPORTED_ENTITY_COUNTS: [usize; 3] = [1, 2, 3];

/// Times the count-2 templates 0, 1 and 2 are emitted per phrase.
pub const DUPLICATED_PAIR_EMISSIONS: usize = 2;

/// Article variants of the interrogative template, in emission order.
pub const GENDERED_ARTICLES: [&str; 2] = ["el", "la"];

const SINGLE_PAIR: [(usize, usize); 1] = [(0, 1)];

/// Pairs used by the count-3 relation templates: (A,B), (B,C), (C,A).
pub const PAIR_CYCLE: [(usize, usize); 3] = [(0, 1), (1, 2), (2, 0)];

/// Pairs used by the count-3 juxtaposition template: (A,B), (B,C), (A,C).
pub const JUXTAPOSED_PAIRS: [(usize, usize); 3] = [(0, 1), (1, 2), (0, 2)];

/// How a template draws entity names from a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slots {
    /// Every name concatenated into `{x}`.
    Joined,
    /// One instantiation per `(a, b)` index pair.
    Pairs(&'static [(usize, usize)]),
}

impl Slots {
    /// Minimum number of names a phrase must carry.
    pub fn required_entities(&self) -> usize {
        match self {
            Self::Joined => 1,
            Self::Pairs(pairs) => pairs
                .iter()
                .map(|(a, b)| a.max(b) + 1)
                .max()
                .unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub entity_count: usize,
    pub body: &'static str,
    pub slots: Slots,
    /// Values for `{article}`; the outermost loop of instantiation.
    pub articles: &'static [&'static str],
    /// Copies of every instantiation, emitted back to back.
    pub emissions: usize,
}

const NO_ARTICLE: &[&str] = &[""];

const fn relation(
    id: &'static str,
    entity_count: usize,
    body: &'static str,
    slots: Slots,
    emissions: usize,
) -> PromptTemplate {
    PromptTemplate {
        id,
        entity_count,
        body,
        slots,
        articles: NO_ARTICLE,
        emissions,
    }
}

static UNIQUE: [PromptTemplate; 2] = [
    relation(
        "prompt_0_unique",
        1,
        "{phrase} La relación entre {x} y la frase anterior es una relación de {mask}.",
        Slots::Joined,
        1,
    ),
    relation(
        "prompt_1_unique",
        1,
        "{phrase} La relación entre {x} y la frase anterior es una relación de tipo {mask}.",
        Slots::Joined,
        1,
    ),
];

static ENT_2: [PromptTemplate; 6] = [
    relation(
        "prompt_0_ent_2",
        2,
        "{phrase} {a} {mask} {b}.",
        Slots::Pairs(&SINGLE_PAIR),
        DUPLICATED_PAIR_EMISSIONS,
    ),
    relation(
        "prompt_1_ent_2",
        2,
        "{phrase} La relación entre {a} y {b} es una relación de tipo {mask}.",
        Slots::Pairs(&SINGLE_PAIR),
        DUPLICATED_PAIR_EMISSIONS,
    ),
    relation(
        "prompt_2_ent_2",
        2,
        "{phrase} La relación entre {a} y {b} es una relación de {mask}.",
        Slots::Pairs(&SINGLE_PAIR),
        DUPLICATED_PAIR_EMISSIONS,
    ),
    relation(
        "prompt_3_ent_2",
        2,
        "{phrase} La relación entre {a} y {b} es de naturaleza {mask}",
        Slots::Pairs(&SINGLE_PAIR),
        1,
    ),
    relation(
        "prompt_4_ent_2",
        2,
        "{phrase} La relación entre {a} y {b} es de carácter {mask}",
        Slots::Pairs(&SINGLE_PAIR),
        1,
    ),
    PromptTemplate {
        id: "prompt_5_ent_2",
        entity_count: 2,
        body: "{phrase} ¿Cuál es la relación entre {a} y {b}? La relación es {article} {mask}",
        slots: Slots::Pairs(&SINGLE_PAIR),
        articles: &GENDERED_ARTICLES,
        emissions: 1,
    },
];

static ENT_3: [PromptTemplate; 6] = [
    relation(
        "prompt_0_ent_3",
        3,
        "{phrase} {a} {mask} {b}.",
        Slots::Pairs(&JUXTAPOSED_PAIRS),
        1,
    ),
    relation(
        "prompt_1_ent_3",
        3,
        "{phrase} La relación entre {a} y {b} es una relación de tipo {mask}.",
        Slots::Pairs(&PAIR_CYCLE),
        1,
    ),
    relation(
        "prompt_2_ent_3",
        3,
        "{phrase} La relación entre {a} y {b} es una relación de {mask}.",
        Slots::Pairs(&PAIR_CYCLE),
        1,
    ),
    relation(
        "prompt_3_ent_3",
        3,
        "{phrase} La relación entre {a} y {b} es de naturaleza {mask}.",
        Slots::Pairs(&PAIR_CYCLE),
        1,
    ),
    relation(
        "prompt_4_ent_3",
        3,
        "{phrase} La relación entre {a} y {b} es de carácter {mask}.",
        Slots::Pairs(&PAIR_CYCLE),
        1,
    ),
    PromptTemplate {
        id: "prompt_5_ent_3",
        entity_count: 3,
        body: "{phrase} ¿Cuál es la relación entre {a} y {b}? La relación es {article} {mask}.",
        slots: Slots::Pairs(&PAIR_CYCLE),
        articles: &GENDERED_ARTICLES,
        emissions: 1,
    },
];

/// Templates for an entity count, in emission order. Empty for unsupported counts.
pub fn catalogue(entity_count: usize) -> &'static [PromptTemplate] {
    match entity_count {
        1 => &UNIQUE,
        2 => &ENT_2,
        3 => &ENT_3,
        _ => &[],
    }
}

pub fn find(entity_count: usize, id: &str) -> Option<&'static PromptTemplate> {
    catalogue(entity_count).iter().find(|template| template.id == id)
}

/// Entity count whose catalogue defines `id`.
pub fn entity_count_of(id: &str) -> Option<usize> {
    SUPPORTED_ENTITY_COUNTS
        .into_iter()
        .find(|count| find(*count, id).is_some())
}

impl PromptTemplate {
    /// Every prompt this template yields for one phrase, wrapped in the family's
    /// special tokens. Order: article, then pair, then repeated emission.
    ///
    /// Special tokens occurring in the phrase or its names are removed first, so
    /// each prompt carries exactly one mask.
    pub fn instantiate(&self, family: ModelFamily, phrase: &MarkedPhrase) -> Result<Vec<String>> {
        let required = self.slots.required_entities();
        let found = phrase.entities.len();
        if found < required {
            return Err(PromptOreError::TemplateCountUnsupported {
                template: self.id,
                required,
                found,
                phrase: phrase.cleaned.clone(),
            });
        }

        let mask = family.mask_token();
        let cleaned = family.strip_special_tokens(&phrase.cleaned);
        let names: Vec<String> = phrase
            .entities
            .iter()
            .map(|name| family.strip_special_tokens(name))
            .collect();
        let joined;
        let pairs: Vec<(&str, &str)> = match self.slots {
            Slots::Joined => {
                joined = names.concat();
                vec![(joined.as_str(), "")]
            }
            Slots::Pairs(pairs) => pairs
                .iter()
                .map(|&(a, b)| (names[a].as_str(), names[b].as_str()))
                .collect(),
        };

        let mut prompts = Vec::with_capacity(self.articles.len() * pairs.len() * self.emissions);
        for &article in self.articles {
            for &(a, b) in &pairs {
                let body = render(
                    self.body,
                    &[
                        ("phrase", cleaned.as_str()),
                        ("a", a),
                        ("b", b),
                        ("x", a),
                        ("article", article),
                        ("mask", mask),
                    ],
                );
                let prompt = family.wrap(&body);
                for _ in 1..self.emissions {
                    prompts.push(prompt.clone());
                }
                prompts.push(prompt);
            }
        }
        Ok(prompts)
    }
}

/// Substitute `{name}` placeholders in one pass. Substituted values are never
/// rescanned, so braces inside phrases survive untouched.
fn render(body: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(body.len() * 2);
    let mut rest = body;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrase(cleaned: &str, names: &[&str]) -> MarkedPhrase {
        MarkedPhrase {
            cleaned: cleaned.to_string(),
            entities: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[test]
    fn render_ignores_unknown_and_substituted_braces() {
        assert_eq!(render("{a} {zz} {", &[("a", "{b}"), ("b", "no")]), "{b} {zz} {");
    }

    #[test]
    fn required_entities_follow_pairs() {
        assert_eq!(Slots::Joined.required_entities(), 1);
        assert_eq!(Slots::Pairs(&SINGLE_PAIR).required_entities(), 2);
        assert_eq!(Slots::Pairs(&PAIR_CYCLE).required_entities(), 3);
    }

    #[test]
    fn every_template_has_one_mask() {
        for count in SUPPORTED_ENTITY_COUNTS {
            for template in catalogue(count) {
                assert_eq!(template.body.matches("{mask}").count(), 1, "{}", template.id);
                assert_eq!(template.entity_count, count);
            }
        }
        assert!(catalogue(4).is_empty());
    }

    #[test]
    fn ids_resolve_to_their_count() {
        assert_eq!(entity_count_of("prompt_1_unique"), Some(1));
        assert_eq!(entity_count_of("prompt_5_ent_3"), Some(3));
        assert_eq!(entity_count_of("prompt_9_ent_2"), None);
    }

    #[test]
    fn unique_templates_concatenate_names() {
        let prompts = find(1, "prompt_0_unique")
            .unwrap()
            .instantiate(ModelFamily::Bert, &phrase("Ana llegó.", &["Ana"]))
            .unwrap();
        assert_eq!(
            prompts,
            vec!["[CLS] Ana llegó. La relación entre Ana y la frase anterior es una relación de [MASK]. [SEP]"]
        );
    }

    #[test]
    fn gendered_template_is_article_major() {
        let prompts = find(3, "prompt_5_ent_3")
            .unwrap()
            .instantiate(ModelFamily::Roberta, &phrase("p.", &["A", "B", "C"]))
            .unwrap();
        assert_eq!(prompts.len(), 6);
        assert!(prompts[..3].iter().all(|p| p.contains("es el <mask>.")));
        assert!(prompts[3..].iter().all(|p| p.contains("es la <mask>.")));
        assert!(prompts[2].contains("entre C y A?"));
    }

    #[test]
    fn document_special_tokens_never_add_masks() {
        let marked = phrase("El token <mask> de Ana y Luis.", &["Ana<mask>", "</s>Luis"]);
        for template in catalogue(2) {
            for prompt in template.instantiate(ModelFamily::Roberta, &marked).unwrap() {
                assert_eq!(prompt.matches("<mask>").count(), 1, "{prompt}");
                assert_eq!(prompt.matches("</s>").count(), 1, "{prompt}");
                assert!(prompt.starts_with("<s> El token  de Ana y Luis."));
            }
        }
    }

    #[test]
    fn short_phrases_are_rejected() {
        let err = find(3, "prompt_1_ent_3")
            .unwrap()
            .instantiate(ModelFamily::Bert, &phrase("p.", &["A", "B"]))
            .unwrap_err();
        assert!(matches!(
            err,
            PromptOreError::TemplateCountUnsupported {
                required: 3,
                found: 2,
                ..
            }
        ));
    }
}
