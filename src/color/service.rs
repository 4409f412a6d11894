use crate::store::{Variable, VariableStore};

use super::{derive_variations, hex_to_rgb, pick_accessible_text_color, ColorVariations};

pub const PRIMARY_BASE_VAR: &str = "--color-primary-base";
pub const PRIMARY_LIGHT_VAR: &str = "--color-primary-light";
pub const PRIMARY_DARK_VAR: &str = "--color-primary-dark";
pub const TEXT_ON_PRIMARY_VAR: &str = "--color-text-on-primary";

const PRIMARY_VARS: [&str; 4] = [
    PRIMARY_BASE_VAR,
    PRIMARY_LIGHT_VAR,
    PRIMARY_DARK_VAR,
    TEXT_ON_PRIMARY_VAR,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceValues {
    pub primary: f64,
    pub light: f64,
    pub dark: f64,
}

/// Runtime color boundary for the presentation layer.
///
/// Owns the live variable store; every write is visible to readers of
/// [`ColorService::store`] as soon as the call returns.
#[derive(Debug, Clone, Default)]
pub struct ColorService {
    store: VariableStore,
}

impl ColorService {
    pub fn new(store: VariableStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn set_primary_color(&mut self, color: &str) -> ColorVariations {
        let variations = derive_variations(color);
        self.update_primary_colors(&variations);
        variations
    }

    pub fn update_primary_colors(&mut self, variations: &ColorVariations) {
        let text_color = pick_accessible_text_color(&variations.primary);
        self.store.set(PRIMARY_BASE_VAR, &variations.primary);
        self.store.set(PRIMARY_LIGHT_VAR, &variations.light);
        self.store.set(PRIMARY_DARK_VAR, &variations.dark);
        self.store.set(TEXT_ON_PRIMARY_VAR, text_color);
        tracing::debug!(
            primary = %variations.primary,
            light = %variations.light,
            dark = %variations.dark,
            text = text_color,
            "updated primary colors"
        );
    }

    pub fn current_colors(&self) -> ColorVariations {
        let read = |name: &str| {
            self.store
                .value(name)
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        ColorVariations {
            primary: read(PRIMARY_BASE_VAR),
            light: read(PRIMARY_LIGHT_VAR),
            dark: read(PRIMARY_DARK_VAR),
        }
    }

    /// The variables written by [`ColorService::set_primary_color`], in write order.
    pub fn primary_variables(&self) -> Vec<Variable> {
        PRIMARY_VARS
            .iter()
            .filter_map(|name| self.store.get(name).cloned())
            .collect()
    }
}

pub fn luminance_values(variations: &ColorVariations) -> LuminanceValues {
    LuminanceValues {
        primary: hex_to_rgb(&variations.primary).luminance(),
        light: hex_to_rgb(&variations.light).luminance(),
        dark: hex_to_rgb(&variations.dark).luminance(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, WHITE};

    #[test]
    fn set_primary_color_writes_variants_and_text_color() {
        let mut service = ColorService::default();
        let variations = service.set_primary_color("#000000");

        assert_eq!(service.current_colors(), variations);
        assert_eq!(service.store().value(PRIMARY_BASE_VAR), Some("#000000"));
        assert_eq!(service.store().value(PRIMARY_LIGHT_VAR), Some("#d9d9d9"));
        assert_eq!(service.store().value(PRIMARY_DARK_VAR), Some("#000000"));
        assert_eq!(service.store().value(TEXT_ON_PRIMARY_VAR), Some(WHITE));
    }

    #[test]
    fn set_primary_color_keeps_existing_comments_and_other_variables() {
        let mut store = VariableStore::new();
        store.insert(Variable::new(PRIMARY_BASE_VAR, "#111111").with_comment("color.primary.base"));
        store.insert(Variable::new("--radius-md", "6px"));
        let mut service = ColorService::new(store);

        service.set_primary_color("#ffffff");

        let base = service.store().get(PRIMARY_BASE_VAR).expect("base variable kept");
        assert_eq!(base.value, "#ffffff");
        assert_eq!(base.comment.as_deref(), Some("color.primary.base"));
        assert_eq!(service.store().value("--radius-md"), Some("6px"));
        assert_eq!(service.store().value(TEXT_ON_PRIMARY_VAR), Some(BLACK));
        assert_eq!(service.primary_variables().len(), 4);
    }

    #[test]
    fn current_colors_is_empty_for_unset_store() {
        let service = ColorService::default();
        let colors = service.current_colors();
        assert!(colors.primary.is_empty());
        assert!(colors.light.is_empty());
        assert!(colors.dark.is_empty());
        assert!(service.primary_variables().is_empty());
    }

    #[test]
    fn luminance_values_orders_light_above_dark() {
        let mut service = ColorService::default();
        let variations = service.set_primary_color("#3b82f6");
        let values = luminance_values(&variations);
        assert!(values.light > values.primary);
        assert!(values.dark < values.primary);
    }
}
