use renderer::{GeometryVariant, ParameterPatch, ProjectionVariant, Rgb};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScheme {
    pub name: &'static str,
    pub primary: Rgb,
    pub secondary: Rgb,
    pub background: Rgb,
}

pub static COLOR_SCHEMES: [ColorScheme; 5] = [
    ColorScheme {
        name: "magenta",
        primary: [1.0, 0.0, 1.0],
        secondary: [0.0, 1.0, 1.0],
        background: [0.02, 0.02, 0.05],
    },
    ColorScheme {
        name: "ocean",
        primary: [0.1, 0.5, 1.0],
        secondary: [0.0, 0.9, 0.7],
        background: [0.0, 0.03, 0.08],
    },
    ColorScheme {
        name: "ember",
        primary: [1.0, 0.45, 0.1],
        secondary: [1.0, 0.85, 0.2],
        background: [0.06, 0.02, 0.01],
    },
    ColorScheme {
        name: "forest",
        primary: [0.2, 0.9, 0.4],
        secondary: [0.7, 1.0, 0.3],
        background: [0.01, 0.05, 0.02],
    },
    ColorScheme {
        name: "mono",
        primary: [0.9, 0.9, 0.9],
        secondary: [0.5, 0.5, 0.55],
        background: [0.03, 0.03, 0.03],
    },
];

/// A named look: variants, palette and a complexity scalar in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorialPreset {
    pub name: &'static str,
    pub geometry: GeometryVariant,
    pub projection: ProjectionVariant,
    pub color_scheme: &'static str,
    pub complexity: f32,
}

impl EditorialPreset {
    pub fn colors(&self) -> ColorScheme {
        color_scheme(self.color_scheme).unwrap_or(COLOR_SCHEMES[0])
    }

    /// Variants and palette of the preset, nothing else.
    pub fn base_patch(&self) -> ParameterPatch {
        let colors = self.colors();
        ParameterPatch {
            geometry: Some(self.geometry),
            projection: Some(self.projection),
            primary_color: Some(colors.primary),
            secondary_color: Some(colors.secondary),
            background_color: Some(colors.background),
            ..ParameterPatch::default()
        }
    }
}

const fn preset(
    name: &'static str,
    geometry: GeometryVariant,
    projection: ProjectionVariant,
    color_scheme: &'static str,
    complexity: f32,
) -> EditorialPreset {
    EditorialPreset {
        name,
        geometry,
        projection,
        color_scheme,
        complexity,
    }
}

pub const DEFAULT_SECTION: &str = "home";

pub static SECTION_PRESETS: [EditorialPreset; 5] = [
    preset(
        "home",
        GeometryVariant::Hypercube,
        ProjectionVariant::Perspective,
        "magenta",
        0.5,
    ),
    preset(
        "technology",
        GeometryVariant::Hypercube,
        ProjectionVariant::Orthographic,
        "ocean",
        0.8,
    ),
    preset(
        "science",
        GeometryVariant::Hypersphere,
        ProjectionVariant::Stereographic,
        "forest",
        0.7,
    ),
    preset(
        "culture",
        GeometryVariant::Hypersphere,
        ProjectionVariant::Perspective,
        "ember",
        0.4,
    ),
    preset(
        "analysis",
        GeometryVariant::Hypertetrahedron,
        ProjectionVariant::Orthographic,
        "mono",
        0.9,
    ),
];

pub static EDITORIAL_PRESETS: [EditorialPreset; 4] = [
    preset(
        "minimal",
        GeometryVariant::Hypercube,
        ProjectionVariant::Orthographic,
        "mono",
        0.2,
    ),
    preset(
        "immersive",
        GeometryVariant::Hypersphere,
        ProjectionVariant::Stereographic,
        "ocean",
        0.8,
    ),
    preset(
        "analytical",
        GeometryVariant::Hypertetrahedron,
        ProjectionVariant::Orthographic,
        "forest",
        0.9,
    ),
    preset(
        "energetic",
        GeometryVariant::Hypertetrahedron,
        ProjectionVariant::Perspective,
        "ember",
        1.0,
    ),
];

fn find<'a, T>(items: &'a [T], name: &str, key: impl Fn(&T) -> &str) -> Option<&'a T> {
    let wanted = name.trim();
    items
        .iter()
        .find(|item| key(*item).eq_ignore_ascii_case(wanted))
}

pub fn section_preset(name: &str) -> Option<&'static EditorialPreset> {
    find(&SECTION_PRESETS, name, |preset| preset.name)
}

pub fn default_section_preset() -> &'static EditorialPreset {
    &SECTION_PRESETS[0]
}

pub fn editorial_preset(name: &str) -> Option<&'static EditorialPreset> {
    find(&EDITORIAL_PRESETS, name, |preset| preset.name)
}

pub fn color_scheme(name: &str) -> Option<ColorScheme> {
    find(&COLOR_SCHEMES, name, |scheme| scheme.name).copied()
}
