use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::models::MODEL_CLASSES;

/// One named animation: which model class to drive and its palette indices.
/// The first color in effect is the accent used for decorations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationDefinition {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub colors: Vec<u8>,
    /// Replaces `colors` when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Vec<u8>>,
    /// Spawn-rate multiplier handed to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<f64>,
}

impl AnimationDefinition {
    pub fn new(name: &str, class: &str, colors: &[u8]) -> Self {
        Self {
            name: name.to_owned(),
            class: class.to_owned(),
            colors: colors.to_vec(),
            theme: None,
            activity: None,
        }
    }

    /// Structural checks only. An unknown class is reported when the
    /// animation is spawned, so it fails that animation alone.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("animation name cannot be empty");
        }
        if self.class.trim().is_empty() {
            bail!("animation '{}' has an empty class", self.name);
        }
        if let Some(activity) = self.activity {
            if !activity.is_finite() || activity <= 0.0 {
                bail!(
                    "animation '{}' activity must be finite and > 0, got {}",
                    self.name,
                    activity
                );
            }
        }
        Ok(())
    }

    /// Palette indices in effect: the theme when set, otherwise `colors`.
    pub fn colors(&self) -> &[u8] {
        self.theme
            .as_deref()
            .filter(|theme| !theme.is_empty())
            .unwrap_or(&self.colors)
    }

    pub fn slug(&self) -> String {
        slug(&self.name)
    }

    pub fn has_known_class(&self) -> bool {
        MODEL_CLASSES.contains(&self.class.as_str())
    }
}

/// Lower-case with spaces replaced by hyphens: `"Violet Rain"` -> `"violet-rain"`.
pub fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    animations: Vec<AnimationDefinition>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            animations: vec![
                AnimationDefinition::new("Starfield", "starfield", &[51, 45, 87, 123, 159]),
                AnimationDefinition::new("Ember Drift", "starfield", &[208, 196, 202, 214, 220]),
                AnimationDefinition::new("Ripple", "ripple", &[39, 33, 45, 81, 117]),
                AnimationDefinition::new("Violet Rain", "ripple", &[135, 93, 129, 165, 201]),
            ],
        }
    }

    /// The config's `animations`, or the built-in catalog when it lists none.
    pub fn from_config(config: &RenderConfig) -> Self {
        if config.animations.is_empty() {
            Self::builtin()
        } else {
            Self {
                animations: config.animations.clone(),
            }
        }
    }

    pub fn animations(&self) -> &[AnimationDefinition] {
        &self.animations
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Keeps the animation whose name or slug matches `only`, case-insensitively.
    pub fn select(self, only: Option<&str>) -> Result<Self> {
        let Some(only) = only else {
            return Ok(self);
        };
        let wanted = slug(only.trim());
        let animations = self
            .animations
            .into_iter()
            .filter(|animation| animation.slug() == wanted)
            .collect::<Vec<_>>();
        if animations.is_empty() {
            bail!("no animation named '{}' in the catalog", only);
        }
        Ok(Self { animations })
    }
}

#[cfg(test)]
mod tests {
    use super::{slug, AnimationDefinition, Catalog};
    use crate::config::RenderConfig;

    #[test]
    fn slug_lowercases_and_hyphenates() {
        assert_eq!(slug("Violet Rain"), "violet-rain");
        assert_eq!(slug("Starfield"), "starfield");
        assert_eq!(slug("A  B"), "a--b");
    }

    #[test]
    fn builtin_catalog_uses_known_classes() {
        let catalog = Catalog::builtin();
        assert!(!catalog.is_empty());
        for animation in catalog.animations() {
            animation.validate().unwrap();
            assert!(animation.has_known_class(), "{}", animation.name);
            assert!(!animation.colors.is_empty());
        }
    }

    #[test]
    fn config_animations_replace_builtin() {
        let mut config = RenderConfig::default();
        assert_eq!(Catalog::from_config(&config), Catalog::builtin());
        config.animations = vec![AnimationDefinition::new("Solo", "ripple", &[46])];
        let catalog = Catalog::from_config(&config);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.animations()[0].name, "Solo");
    }

    #[test]
    fn theme_replaces_colors_and_activity_is_checked() {
        let mut animation = AnimationDefinition::new("Starfield", "starfield", &[51, 45]);
        assert_eq!(animation.colors(), &[51, 45]);
        animation.theme = Some(vec![196]);
        assert_eq!(animation.colors(), &[196]);
        animation.theme = Some(Vec::new());
        assert_eq!(animation.colors(), &[51, 45]);

        animation.activity = Some(2.0);
        animation.validate().unwrap();
        animation.activity = Some(0.0);
        assert!(animation.validate().is_err());
        animation.activity = Some(f64::NAN);
        assert!(animation.validate().is_err());
    }

    #[test]
    fn select_matches_name_or_slug() {
        let by_name = Catalog::builtin().select(Some("violet rain")).unwrap();
        assert_eq!(by_name.animations()[0].name, "Violet Rain");
        let by_slug = Catalog::builtin().select(Some("ember-drift")).unwrap();
        assert_eq!(by_slug.animations()[0].name, "Ember Drift");
        assert!(Catalog::builtin().select(Some("aurora")).is_err());
        assert_eq!(Catalog::builtin().select(None).unwrap().len(), 4);
    }
}
