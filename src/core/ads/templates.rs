/// Timing and outro styling for one video template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoTemplate {
    pub id: &'static str,
    /// Target length in seconds. `None` keeps whatever the scenes add up to.
    pub total_secs: Option<f64>,
    pub intro_secs: f64,
    pub outro_secs: f64,
    pub outro_text: &'static str,
    pub font_size: u32,
    /// Demo templates are served from a pre-rendered clip instead of composed.
    pub uses_placeholder: bool,
}

pub const DEFAULT_FONT_SIZE: u32 = 48;

const fn composed(
    id: &'static str,
    total: f64,
    intro: f64,
    outro_text: &'static str,
    font_size: u32,
) -> VideoTemplate {
    VideoTemplate {
        id,
        total_secs: Some(total),
        intro_secs: intro,
        outro_secs: 2.0,
        outro_text,
        font_size,
        uses_placeholder: false,
    }
}

const fn placeholder(
    id: &'static str,
    total: f64,
    outro_text: &'static str,
    font_size: u32,
) -> VideoTemplate {
    VideoTemplate {
        id,
        total_secs: Some(total),
        intro_secs: 0.0,
        outro_secs: 2.0,
        outro_text,
        font_size,
        uses_placeholder: true,
    }
}

pub const TEMPLATES: [VideoTemplate; 11] = [
    composed("standard", 30.0, 3.0, "Learn More at Our Website!", 48),
    composed("fast_paced", 15.0, 2.0, "Check it out now!", 40),
    composed("luxury_showcase", 30.0, 5.0, "Experience Luxury Today", 60),
    composed("explainer", 60.0, 2.0, "Find out more on our site", 45),
    placeholder("anime_10s", 10.0, "ClipOpera Anime Ads!", 55),
    placeholder("anime_30s", 30.0, "ClipOpera Anime Ads!", 50),
    placeholder("anime_60s", 60.0, "ClipOpera Anime Ads!", 45),
    placeholder("ascii_art_ad", 30.0, "ASCII Ad by ClipOpera!", 40),
    placeholder("retro_8bit_ad", 30.0, "8-Bit Fun with ClipOpera!", 30),
    placeholder("retro_16bit_ad", 30.0, "Level Up Your Ads!", 36),
    placeholder("retro_32bit_ad", 30.0, "Experience Retro Power!", 42),
];

/// Used for ids that are not in the table.
pub const FALLBACK_TEMPLATE: VideoTemplate = VideoTemplate {
    id: "",
    total_secs: None,
    intro_secs: 0.0,
    outro_secs: 2.0,
    outro_text: "Visit our website!",
    font_size: DEFAULT_FONT_SIZE,
    uses_placeholder: false,
};

pub fn find_template(id: &str) -> VideoTemplate {
    TEMPLATES
        .iter()
        .find(|t| t.id == id)
        .copied()
        .unwrap_or(FALLBACK_TEMPLATE)
}

impl VideoTemplate {
    pub fn placeholder_url(&self) -> Option<String> {
        self.uses_placeholder
            .then(|| format!("https://example.com/{}.mp4", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_templates_resolve() {
        let luxury = find_template("luxury_showcase");
        assert_eq!(luxury.total_secs, Some(30.0));
        assert_eq!(luxury.intro_secs, 5.0);
        assert_eq!(luxury.font_size, 60);
        assert_eq!(luxury.placeholder_url(), None);

        let retro = find_template("retro_16bit_ad");
        assert_eq!(retro.outro_text, "Level Up Your Ads!");
        assert_eq!(
            retro.placeholder_url().as_deref(),
            Some("https://example.com/retro_16bit_ad.mp4")
        );
    }

    #[test]
    fn unknown_template_has_no_fixed_length() {
        let t = find_template("vertical_story");
        assert_eq!(t.total_secs, None);
        assert_eq!(t.outro_secs, 2.0);
        assert_eq!(t.outro_text, "Visit our website!");
        assert_eq!(t.font_size, 48);
    }

    #[test]
    fn template_ids_are_unique() {
        for (i, a) in TEMPLATES.iter().enumerate() {
            assert!(TEMPLATES[i + 1..].iter().all(|b| b.id != a.id));
        }
    }
}
