//! Artifact generation: manifest × output targets → file contents.
//!
//! Generation happens in two passes. First every token value is resolved
//! through the [`TransformSet`], which picks a transform by the token's
//! *category* (the top-level manifest key), not by its declared type. Then
//! each target's [`Format`] renderer turns the resolved tokens into bytes.
//!
//! Both tables are plain values owned by an [`ArtifactGenerator`]; nothing is
//! registered globally, so two generators never observe each other's rules.
//! Adding a format means adding a variant and registering a renderer in
//! [`FormatRegistry`]; the orchestrator is untouched.
//!
//! Generation is pure. Writing the artifacts to disk is a separate step in
//! [`crate::synchronise`].

mod formats;
mod transforms;

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::manifest::TokenManifest;

pub use transforms::{TransformSet, ValueTransform};

/// Rendering format of one output target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "css/variables")]
    CssVariables,
    #[serde(rename = "scss/variables")]
    ScssVariables,
    #[serde(rename = "javascript/es6")]
    Es6Module,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::CssVariables => "css/variables",
            Format::ScssVariables => "scss/variables",
            Format::Es6Module => "javascript/es6",
        };
        f.write_str(name)
    }
}

/// One artifact to produce: where it goes in the repository and how it is
/// rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    pub destination: String,
    pub format: Format,
}

impl OutputTarget {
    pub fn new(destination: impl Into<String>, format: Format) -> Self {
        OutputTarget {
            destination: destination.into(),
            format,
        }
    }

    /// The three targets of the reference configuration.
    pub fn reference_set() -> Vec<OutputTarget> {
        vec![
            OutputTarget::new("output/tokens.css", Format::CssVariables),
            OutputTarget::new("output/tokens.scss", Format::ScssVariables),
            OutputTarget::new("output/tokens.js", Format::Es6Module),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub target: OutputTarget,
    pub content: Vec<u8>,
}

/// A token after value transforms, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub category: String,
    pub name: String,
    pub value: String,
    pub description: String,
}

impl ResolvedToken {
    /// Kebab-case variable name built from category and token name,
    /// e.g. `color` + `primaryDark` → `color-primary-dark`.
    pub fn variable_name(&self) -> String {
        kebab_case(&[self.category.as_str(), self.name.as_str()])
    }
}

/// Renders resolved tokens, in manifest order, into file contents.
pub type Renderer = fn(&[ResolvedToken]) -> Vec<u8>;

/// Mapping from format to renderer.
#[derive(Clone)]
pub struct FormatRegistry {
    renderers: HashMap<Format, Renderer>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.renderers.keys()).finish()
    }
}

impl FormatRegistry {
    pub fn empty() -> Self {
        FormatRegistry {
            renderers: HashMap::new(),
        }
    }

    pub fn register(&mut self, format: Format, renderer: Renderer) -> &mut Self {
        self.renderers.insert(format, renderer);
        self
    }

    pub fn get(&self, format: Format) -> Option<Renderer> {
        self.renderers.get(&format).copied()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = FormatRegistry::empty();
        registry
            .register(Format::CssVariables, formats::css_variables)
            .register(Format::ScssVariables, formats::scss_variables)
            .register(Format::Es6Module, formats::es6_module);
        registry
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArtifactGenerator {
    transforms: TransformSet,
    formats: FormatRegistry,
}

impl ArtifactGenerator {
    pub fn new(transforms: TransformSet, formats: FormatRegistry) -> Self {
        ArtifactGenerator {
            transforms,
            formats,
        }
    }

    /// Render `manifest` once per target. Either every artifact is produced or
    /// an error is returned; there is no partial output.
    pub fn generate(
        &self,
        manifest: &TokenManifest,
        targets: &[OutputTarget],
    ) -> Result<Vec<GeneratedArtifact>, GenerationError> {
        // Fail on a bad target list before doing any work.
        let mut destinations = HashSet::with_capacity(targets.len());
        if let Some(dup) = targets.iter().find(|t| !destinations.insert(t.destination.as_str())) {
            warn!(destination = %dup.destination, "[GENERATE] Duplicate output destination");
            return Err(GenerationError::DuplicateDestination(dup.destination.clone()));
        }

        let renderers = targets
            .iter()
            .map(|t| {
                self.formats
                    .get(t.format)
                    .ok_or(GenerationError::UnsupportedFormat(t.format))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let resolved = self.resolve(manifest)?;

        let artifacts: Vec<GeneratedArtifact> = targets
            .iter()
            .zip(renderers)
            .map(|(target, render)| {
                let content = render(&resolved);
                debug!(
                    destination = %target.destination,
                    format = %target.format,
                    bytes = content.len(),
                    "[GENERATE] Rendered artifact"
                );
                GeneratedArtifact {
                    target: target.clone(),
                    content,
                }
            })
            .collect();

        info!(
            artifacts = artifacts.len(),
            tokens = resolved.len(),
            "[GENERATE] Generated artifacts"
        );
        Ok(artifacts)
    }

    /// Apply value transforms to every token, in manifest order.
    pub fn resolve(&self, manifest: &TokenManifest) -> Result<Vec<ResolvedToken>, GenerationError> {
        let mut resolved = Vec::with_capacity(manifest.token_count());
        for (category, tokens) in manifest.categories() {
            let transform = self.transforms.resolve(category);
            for (name, token) in tokens {
                let value = match transform {
                    Some(t) => (t.apply)(&token.value).ok_or_else(|| GenerationError::Transform {
                        transform: t.name,
                        category: category.to_string(),
                        token: name.clone(),
                        value: token.value.clone(),
                    })?,
                    None => token.value.clone(),
                };
                resolved.push(ResolvedToken {
                    category: category.to_string(),
                    name: name.clone(),
                    value,
                    description: token.description.clone(),
                });
            }
        }
        for collision in variable_collisions(&resolved) {
            warn!(
                variable = %collision.variable,
                first = %collision.first,
                second = %collision.second,
                "[GENERATE] Tokens share a variable name; both are emitted"
            );
        }
        Ok(resolved)
    }
}

/// Two tokens whose names kebab-case to the same variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableCollision {
    pub variable: String,
    pub first: String,
    pub second: String,
}

/// Every pair of tokens that would render as the same variable, reported
/// against the first token that claimed the name.
pub fn variable_collisions(tokens: &[ResolvedToken]) -> Vec<VariableCollision> {
    let mut claimed: HashMap<String, String> = HashMap::with_capacity(tokens.len());
    let mut collisions = Vec::new();
    for token in tokens {
        let path = format!("{}.{}", token.category, token.name);
        let variable = token.variable_name();
        match claimed.get(&variable) {
            Some(first) => collisions.push(VariableCollision {
                variable,
                first: first.clone(),
                second: path,
            }),
            None => {
                claimed.insert(variable, path);
            }
        }
    }
    collisions
}

/// Split each part on non-alphanumerics and lower→upper case boundaries, then
/// join the lowercased words with `-`.
pub fn kebab_case(parts: &[&str]) -> String {
    let mut words: Vec<String> = Vec::new();
    for part in parts {
        let mut current = String::new();
        let mut prev_lower = false;
        for c in part.chars() {
            if !c.is_alphanumeric() {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                prev_lower = false;
                continue;
            }
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            current.extend(c.to_lowercase());
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words.join("-")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn manifest(json: &str) -> TokenManifest {
        TokenManifest::parse(json.as_bytes(), Path::new("tokens.json")).expect("valid manifest")
    }

    fn artifact_text(artifacts: &[GeneratedArtifact], destination: &str) -> String {
        let artifact = artifacts
            .iter()
            .find(|a| a.target.destination == destination)
            .expect("artifact present");
        String::from_utf8(artifact.content.clone()).expect("utf-8")
    }

    const SAMPLE: &str = r##"{
        "color": {"primary": {"value": "#112233", "type": "color"}},
        "size": {"gap": {"value": "4", "type": "size"}}
    }"##;

    #[test]
    fn renders_reference_targets() {
        let generator = ArtifactGenerator::default();
        let artifacts = generator
            .generate(&manifest(SAMPLE), &OutputTarget::reference_set())
            .expect("generate");
        assert_eq!(artifacts.len(), 3);

        let css = artifact_text(&artifacts, "output/tokens.css");
        assert!(css.contains("--color-primary: #112233;"), "{css}");
        assert!(css.contains("--size-gap: 4px;"), "{css}");

        let scss = artifact_text(&artifacts, "output/tokens.scss");
        assert!(scss.contains("$color-primary: #112233;"), "{scss}");
        assert!(scss.contains("$size-gap: 4px;"), "{scss}");

        let js = artifact_text(&artifacts, "output/tokens.js");
        assert!(js.contains("export const tokens = {"), "{js}");
        assert!(js.contains("gap: \"4px\","), "{js}");
    }

    #[test]
    fn generation_is_deterministic() {
        let generator = ArtifactGenerator::default();
        let m = manifest(SAMPLE);
        let targets = OutputTarget::reference_set();
        let first = generator.generate(&m, &targets).expect("first");
        let second = generator.generate(&m, &targets).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn transform_is_chosen_by_category_not_type() {
        let generator = ArtifactGenerator::default();
        let resolved = generator
            .resolve(&manifest(
                r##"{"spacing": {"gap": {"value": "8", "type": "size"}},
                    "size": {"swatch": {"value": "12", "type": "color"}},
                    "color": {"red": {"value": "#FF0000", "type": "color"}}}"##,
            ))
            .expect("resolve");
        assert_eq!(resolved[0].value, "8");
        assert_eq!(resolved[1].value, "12px");
        assert_eq!(resolved[2].value, "#FF0000");
    }

    #[test]
    fn non_numeric_size_is_a_generation_error() {
        let generator = ArtifactGenerator::default();
        let err = generator
            .generate(
                &manifest(r#"{"size": {"gap": {"value": "wide"}}}"#),
                &OutputTarget::reference_set(),
            )
            .expect_err("should fail");
        assert!(matches!(err, GenerationError::Transform { ref token, .. } if token == "gap"));
    }

    #[test]
    fn unregistered_format_fails_before_rendering() {
        let mut registry = FormatRegistry::empty();
        registry.register(Format::CssVariables, formats::css_variables);
        let generator = ArtifactGenerator::new(TransformSet::default(), registry);
        let err = generator
            .generate(&manifest(SAMPLE), &OutputTarget::reference_set())
            .expect_err("scss is not registered");
        assert!(matches!(err, GenerationError::UnsupportedFormat(Format::ScssVariables)));
    }

    #[test]
    fn custom_renderer_can_be_registered() {
        fn names_only(tokens: &[ResolvedToken]) -> Vec<u8> {
            tokens
                .iter()
                .map(|t| t.variable_name())
                .collect::<Vec<_>>()
                .join(",")
                .into_bytes()
        }
        let mut registry = FormatRegistry::default();
        registry.register(Format::CssVariables, names_only);
        let generator = ArtifactGenerator::new(TransformSet::default(), registry);
        let artifacts = generator
            .generate(
                &manifest(SAMPLE),
                &[OutputTarget::new("names.txt", Format::CssVariables)],
            )
            .expect("generate");
        assert_eq!(artifacts[0].content, b"color-primary,size-gap".to_vec());
    }

    #[test]
    fn arbitrary_number_of_targets() {
        let generator = ArtifactGenerator::default();
        let targets = vec![
            OutputTarget::new("a.css", Format::CssVariables),
            OutputTarget::new("b.css", Format::CssVariables),
            OutputTarget::new("c.scss", Format::ScssVariables),
            OutputTarget::new("d.js", Format::Es6Module),
            OutputTarget::new("e.js", Format::Es6Module),
        ];
        let artifacts = generator.generate(&manifest(SAMPLE), &targets).expect("generate");
        assert_eq!(artifacts.len(), 5);
        assert_eq!(artifacts[0].content, artifacts[1].content);
        assert!(generator.generate(&manifest(SAMPLE), &[]).expect("empty").is_empty());
    }

    #[test]
    fn colliding_variable_names_are_reported() {
        let generator = ArtifactGenerator::default();
        let resolved = generator
            .resolve(&manifest(
                r##"{"color": {
                    "primaryDark": {"value": "#000000"},
                    "primary_dark": {"value": "#111111"},
                    "primary-dark": {"value": "#222222"},
                    "accent": {"value": "#333333"}
                }}"##,
            ))
            .expect("resolve");
        assert_eq!(resolved.len(), 4);

        let collisions = variable_collisions(&resolved);
        assert_eq!(
            collisions,
            vec![
                VariableCollision {
                    variable: "color-primary-dark".into(),
                    first: "color.primaryDark".into(),
                    second: "color.primary_dark".into(),
                },
                VariableCollision {
                    variable: "color-primary-dark".into(),
                    first: "color.primaryDark".into(),
                    second: "color.primary-dark".into(),
                },
            ]
        );
        assert!(variable_collisions(&generator.resolve(&manifest(SAMPLE)).expect("resolve")).is_empty());
    }

    #[test]
    fn duplicate_destinations_are_rejected() {
        let generator = ArtifactGenerator::default();
        let targets = vec![
            OutputTarget::new("out/t.css", Format::CssVariables),
            OutputTarget::new("out/t.js", Format::Es6Module),
            OutputTarget::new("out/t.css", Format::ScssVariables),
        ];
        let err = generator
            .generate(&manifest(SAMPLE), &targets)
            .expect_err("same destination twice");
        assert!(matches!(err, GenerationError::DuplicateDestination(ref d) if d == "out/t.css"));
    }

    #[test]
    fn kebab_case_splits_words() {
        assert_eq!(kebab_case(&["color", "primaryDark"]), "color-primary-dark");
        assert_eq!(kebab_case(&["size", "gap_lg"]), "size-gap-lg");
        assert_eq!(kebab_case(&["font", "Body Text"]), "font-body-text");
        assert_eq!(kebab_case(&["size", "XL"]), "size-xl");
        assert_eq!(kebab_case(&["space", "100"]), "space-100");
    }

    #[test]
    fn format_serde_names() {
        let target: OutputTarget =
            serde_json::from_str(r#"{"destination": "x.js", "format": "javascript/es6"}"#)
                .expect("deserialize");
        assert_eq!(target.format, Format::Es6Module);
        assert_eq!(Format::ScssVariables.to_string(), "scss/variables");
    }
}
