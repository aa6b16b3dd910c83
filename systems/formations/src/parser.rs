//! Line-oriented formation definition format.
//!
//! ```text
//! # Alpha Sweep | difficulty=2 | probability=Math.max(1, wave / 4) | gap=1.2
//! swarm @0 y=600 color=red
//! swarm @0.5 y=640 group=3 spacing=36   # trailing comments are ignored
//! ---
//! ```
//!
//! A `#` line opens a formation, `---` closes it, and every other line inside
//! a formation describes one ship. Malformed values are ignored rather than
//! reported.

use formation_defence_core::{
    EnemyColor, EnemyType, Formation, FormationId, FormationParts, ShipDescriptor,
};

use crate::probability::compile_probability;

/// Gap inserted after a formation that does not author its own.
pub const DEFAULT_FORMATION_GAP: f64 = 0.75;

/// Values applied to formations that leave them unspecified.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormationDefaults {
    /// Seconds between the last ship of a formation and the next formation.
    pub formation_gap: f64,
    /// Weight used when a probability expression cannot produce a positive value.
    pub minimum_weight: f64,
}

impl Default for FormationDefaults {
    fn default() -> Self {
        Self {
            formation_gap: DEFAULT_FORMATION_GAP,
            minimum_weight: 0.0,
        }
    }
}

/// Formation as authored, before defaults are applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormationDraft {
    /// Explicit identifier. Derived from the label when absent.
    pub id: Option<FormationId>,
    /// Display label.
    pub label: String,
    /// Authored difficulty.
    pub difficulty: Option<f64>,
    /// Raw probability expression.
    pub probability: String,
    /// Authored gap after the formation.
    pub gap: Option<f64>,
    /// Authored first eligible wave.
    pub min_wave: Option<f64>,
    /// Ship lines in authored order.
    pub ships: Vec<ShipDescriptor>,
}

/// Parses formation text and finalises drafts.
///
/// Unlabeled formations are numbered `formation-1`, `formation-2`, ... per parser.
#[derive(Debug, Default)]
pub struct FormationParser {
    unlabeled: u32,
}

impl FormationParser {
    /// Creates a parser with a fresh unlabeled-formation counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `text` and finalises every formation that has ships.
    pub fn parse(&mut self, text: &str, defaults: &FormationDefaults) -> Vec<Formation> {
        self.parse_drafts(text)
            .into_iter()
            .filter_map(|draft| self.finalize(draft, defaults))
            .collect()
    }

    /// Parses `text` into drafts, including drafts without ships.
    pub fn parse_drafts(&mut self, text: &str) -> Vec<FormationDraft> {
        let mut drafts = Vec::new();
        let mut current: Option<FormationDraft> = None;

        for line in text.lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }
            if line == "---" {
                drafts.extend(current.take());
                continue;
            }
            if let Some(header) = line.strip_prefix('#') {
                drafts.extend(current.replace(self.parse_header(header)));
                continue;
            }
            if let (Some(draft), Some(ship)) = (current.as_mut(), parse_ship_line(line)) {
                draft.ships.push(ship);
            }
        }

        drafts.extend(current);
        drafts
    }

    /// Applies defaults to `draft`, discarding it when it has no ships.
    pub fn finalize(
        &mut self,
        draft: FormationDraft,
        defaults: &FormationDefaults,
    ) -> Option<Formation> {
        if draft.ships.is_empty() {
            tracing::debug!(label = %draft.label, "formation without ships discarded");
            return None;
        }
        let id = match draft.id {
            Some(id) => id,
            None => self.identify(&draft.label),
        };
        let probability = compile_probability(&id, &draft.probability, defaults.minimum_weight);
        Formation::new(FormationParts {
            id,
            label: draft.label,
            difficulty: draft.difficulty,
            probability,
            ships: draft.ships,
            gap: draft.gap,
            min_wave: draft.min_wave,
        })
    }

    fn parse_header(&mut self, header: &str) -> FormationDraft {
        let mut segments = header.split('|').map(str::trim);
        let label = segments.next().unwrap_or_default().to_owned();
        let mut draft = FormationDraft {
            id: Some(self.identify(&label)),
            label,
            ..FormationDraft::default()
        };

        for segment in segments.filter(|segment| !segment.is_empty()) {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "difficulty" => draft.difficulty = to_number(Some(value)),
                "probability" => draft.probability = value.to_owned(),
                "gap" => draft.gap = to_number(Some(value)),
                "minwave" => draft.min_wave = to_number(Some(value)),
                _ => {}
            }
        }

        draft
    }

    fn identify(&mut self, label: &str) -> FormationId {
        let slug = slugify(label);
        if slug.is_empty() {
            self.unlabeled += 1;
            FormationId::new(format!("formation-{}", self.unlabeled))
        } else {
            FormationId::new(slug)
        }
    }
}

/// Parses `text` with a fresh [`FormationParser`].
#[must_use]
pub fn parse_formation_text(text: &str, defaults: &FormationDefaults) -> Vec<Formation> {
    FormationParser::new().parse(text, defaults)
}

/// Lowercases `label` and collapses every run of non-alphanumerics into a hyphen.
#[must_use]
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_hyphen = false;
    for character in label.chars() {
        if character.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(character.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

fn parse_ship_line(line: &str) -> Option<ShipDescriptor> {
    let mut tokens = strip_comment(line).split_whitespace();
    let mut ship = ShipDescriptor::new(EnemyType::new(tokens.next()?));

    for token in tokens {
        if let Some(time) = token.strip_prefix('@') {
            ship.time = to_number(Some(time)).unwrap_or(ship.time);
            continue;
        }
        let mut parts = token.split('=');
        let key = parts.next().unwrap_or_default().to_ascii_lowercase();
        let value = parts.next().map(str::trim);
        match key.as_str() {
            "y" => ship.y = to_number(value).or(ship.y),
            "x" => ship.x = to_number(value).or(ship.x),
            "color" => ship.color = value.and_then(EnemyColor::from_tag),
            "group" | "groupsize" => {
                let size = to_number(value).unwrap_or(f64::from(ship.group_size));
                ship.group_size = size.floor().clamp(1.0, f64::from(u32::MAX)) as u32;
            }
            "spacing" => ship.spacing = to_number(value).or(ship.spacing),
            "offset" => ship.offsets.push(to_number(value).unwrap_or(0.0)),
            _ => {}
        }
    }

    Some(ship)
}

/// Drops a trailing ` #` comment.
fn strip_comment(line: &str) -> &str {
    let mut previous_is_space = false;
    for (index, character) in line.char_indices() {
        if character == '#' && previous_is_space {
            return &line[..index];
        }
        previous_is_space = character.is_whitespace();
    }
    line
}

/// Reads a finite number; blank text reads as zero.
fn to_number(value: Option<&str>) -> Option<f64> {
    let value = value?.trim();
    if value.is_empty() {
        return Some(0.0);
    }
    value.parse::<f64>().ok().filter(|number| number.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_collapse_separators() {
        assert_eq!(slugify("  Alpha -- Sweep!! "), "alpha-sweep");
        assert_eq!(slugify("Warfront Saturation"), "warfront-saturation");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn unlabeled_formations_are_numbered_per_parser() {
        let mut parser = FormationParser::new();
        let drafts = parser.parse_drafts("# | difficulty=1\nswarm\n#\ntank\n");
        let ids: Vec<_> = drafts.iter().filter_map(|draft| draft.id.clone()).collect();
        assert_eq!(ids, vec![FormationId::new("formation-1"), FormationId::new("formation-2")]);

        let fresh = FormationParser::new().parse_drafts("#\nswarm\n");
        assert_eq!(fresh[0].id, Some(FormationId::new("formation-1")));
    }

    #[test]
    fn ship_tokens_populate_descriptor() {
        let ship = parse_ship_line(
            "Tank @1.25 x=-620 y=580 color=AUTO group=2.9 spacing=30 offset=-10 offset=abc",
        )
        .expect("ship");
        assert_eq!(ship.enemy_type, EnemyType::tank());
        assert_eq!(ship.time, 1.25);
        assert_eq!(ship.x, Some(-620.0));
        assert_eq!(ship.y, Some(580.0));
        assert_eq!(ship.color, None);
        assert_eq!(ship.group_size, 2);
        assert_eq!(ship.spacing, Some(30.0));
        assert_eq!(ship.offsets, vec![-10.0, 0.0]);
    }

    #[test]
    fn malformed_values_keep_previous_state() {
        let ship = parse_ship_line("swarm @oops y=abc group=0 spacing").expect("ship");
        assert_eq!(ship.time, 0.0);
        assert_eq!(ship.y, None);
        assert_eq!(ship.group_size, 1);
        assert_eq!(ship.spacing, None, "missing value is not a number");
    }

    #[test]
    fn comments_need_leading_whitespace() {
        assert_eq!(strip_comment("swarm @0 # note"), "swarm @0 ");
        assert_eq!(strip_comment("swarm color=#fff"), "swarm color=#fff");
        assert!(parse_ship_line("   ").is_none());
    }

    #[test]
    fn header_keys_are_case_insensitive() {
        let mut parser = FormationParser::new();
        let draft = parser.parse_header(
            " Pincer | Difficulty=3 | MinWave=4.7 | GAP=1.5 | probability=wave >= 2 ? 1 : 0 | junk",
        );
        assert_eq!(draft.label, "Pincer");
        assert_eq!(draft.difficulty, Some(3.0));
        assert_eq!(draft.min_wave, Some(4.7));
        assert_eq!(draft.gap, Some(1.5));
        assert_eq!(draft.probability, "wave >= 2 ? 1 : 0");
    }
}
