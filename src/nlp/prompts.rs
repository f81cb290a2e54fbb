//! Expansion of phrase buckets into prompt sets.

use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{PromptOreError, Result},
    nlp::{
        classify::PhraseBucket,
        family::ModelFamily,
        markers::MarkedPhrase,
        templates::{self, PromptTemplate, SUPPORTED_ENTITY_COUNTS},
    },
};

/// Which templates to expand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ExtractionMode {
    /// Every template for every supported bucket.
    #[default]
    Full,
    /// One template applied to one bucket.
    Single {
        template_id: String,
        entity_count: usize,
    },
}

impl ExtractionMode {
    pub fn single(template_id: impl Into<String>, entity_count: usize) -> Self {
        Self::Single {
            template_id: template_id.into(),
            entity_count,
        }
    }
}

/// Template id to instantiated prompts, in generation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptSet(IndexMap<String, Vec<String>>);

impl PromptSet {
    pub fn get(&self, template_id: &str) -> Option<&[String]> {
        self.0.get(template_id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(id, prompts)| (id.as_str(), prompts.as_slice()))
    }

    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of template ids.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_prompts(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// All prompts in template order, the order the embedder receives them.
    pub fn flatten(&self) -> Vec<String> {
        self.0.values().flatten().cloned().collect()
    }

    /// Write the set as a JSON object, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), templates = self.len(), "saved prompt snapshot");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn extend(&mut self, template_id: &str, prompts: Vec<String>) {
        self.0
            .entry(template_id.to_string())
            .or_default()
            .extend(prompts);
    }
}

/// Expands phrase buckets with the fixed catalogue for one model family.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptEngine {
    family: ModelFamily,
}

impl PromptEngine {
    pub fn new(family: ModelFamily) -> Self {
        Self { family }
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn generate(&self, bucket: &PhraseBucket, mode: &ExtractionMode) -> Result<PromptSet> {
        let mut set = PromptSet::default();
        match mode {
            ExtractionMode::Full => {
                for (count, phrases) in bucket.iter() {
                    let catalogue = templates::catalogue(count);
                    if catalogue.is_empty() {
                        debug!(entity_count = count, phrases = phrases.len(), "skipping bucket");
                        continue;
                    }
                    let parsed = parse_all(phrases);
                    for template in catalogue {
                        self.expand(&mut set, template, &parsed)?;
                    }
                }
            }
            ExtractionMode::Single {
                template_id,
                entity_count,
            } => {
                let template = single_template(template_id, *entity_count)?;
                match bucket.get(*entity_count) {
                    Some(phrases) => self.expand(&mut set, template, &parse_all(phrases))?,
                    None => {
                        warn!(
                            template = template.id,
                            entity_count, "no phrases with this entity count; prompt set is empty"
                        );
                    }
                }
            }
        }
        info!(
            family = %self.family,
            templates = set.len(),
            prompts = set.total_prompts(),
            "generated prompts"
        );
        Ok(set)
    }

    fn expand(
        &self,
        set: &mut PromptSet,
        template: &PromptTemplate,
        phrases: &[MarkedPhrase],
    ) -> Result<()> {
        let mut prompts = Vec::new();
        for phrase in phrases {
            prompts.extend(template.instantiate(self.family, phrase)?);
        }
        set.extend(template.id, prompts);
        Ok(())
    }
}

/// Expand with a throwaway engine.
pub fn generate(bucket: &PhraseBucket, family: ModelFamily, mode: &ExtractionMode) -> Result<PromptSet> {
    PromptEngine::new(family).generate(bucket, mode)
}

fn parse_all(phrases: &[String]) -> Vec<MarkedPhrase> {
    phrases.iter().map(|p| MarkedPhrase::parse(p)).collect()
}

fn single_template(template_id: &str, entity_count: usize) -> Result<&'static PromptTemplate> {
    if !SUPPORTED_ENTITY_COUNTS.contains(&entity_count) {
        return Err(PromptOreError::config(format!(
            "entity count {entity_count} has no templates (expected 1, 2 or 3)"
        )));
    }
    templates::find(entity_count, template_id).ok_or_else(|| {
        PromptOreError::config(format!(
            "template {template_id:?} is not defined for entity count {entity_count}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::classify::classify;

    #[test]
    fn full_mode_skips_unsupported_buckets() {
        let bucket = classify(["sin entidades", "$A$ $B$ $C$ $D$", "$Ana$ llegó"]);
        let set = PromptEngine::default()
            .generate(&bucket, &ExtractionMode::Full)
            .unwrap();
        assert_eq!(
            set.template_ids().collect::<Vec<_>>(),
            vec!["prompt_0_unique", "prompt_1_unique"]
        );
    }

    #[test]
    fn single_mode_validates_template() {
        let bucket = classify(["$Ana$ y $Luis$"]);
        let engine = PromptEngine::default();
        for mode in [
            ExtractionMode::single("prompt_0_ent_2", 4),
            ExtractionMode::single("prompt_0_unique", 2),
        ] {
            assert!(matches!(
                engine.generate(&bucket, &mode),
                Err(PromptOreError::Configuration(_))
            ));
        }
    }

    #[test]
    fn pair_templates_are_doubled() {
        let bucket = classify(["$Ana$ y $Luis$"]);
        let set = generate(&bucket, ModelFamily::Bert, &ExtractionMode::Full).unwrap();
        let counts: Vec<usize> = set.iter().map(|(_, prompts)| prompts.len()).collect();
        assert_eq!(counts, vec![2, 2, 2, 1, 1, 2]);
    }
}
