//! Keyword classifier: free text → three-axis intensity profile.
//!
//! Every axis starts at zero and is folded over [`RULES`] in declaration
//! order. A rule fires when any of its keywords occurs (case-insensitive
//! substring) in `descripcion + " " + nombre`; later matches win.

use destinos_shared::Intensidad;

/// Which intensity axis a rule writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Fisica,
    Vertigo,
    Atletico,
}

/// How a matching rule changes the current axis value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Overwrite.
    Set(u8),
    /// Cap at this level (never raises).
    AtMost(u8),
    /// Floor at this level (never lowers).
    AtLeast(u8),
}

impl Effect {
    fn apply(self, current: u8) -> u8 {
        match self {
            Self::Set(v) => v,
            Self::AtMost(v) => current.min(v),
            Self::AtLeast(v) => current.max(v),
        }
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub axis: Axis,
    pub keywords: &'static [&'static str],
    pub effect: Effect,
}

impl Rule {
    /// Whether any keyword occurs in the already-lowercased `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k))
    }
}

const fn rule(axis: Axis, keywords: &'static [&'static str], effect: Effect) -> Rule {
    Rule {
        axis,
        keywords,
        effect,
    }
}

/// The classification table, in evaluation order.
pub const RULES: &[Rule] = &[
    // fisica
    rule(
        Axis::Fisica,
        &["nadar", "snorkel", "buceo", "caminar", "recorrer"],
        Effect::Set(2),
    ),
    rule(
        Axis::Fisica,
        &["tirolesa", "zipline", "atv", "aventura", "exploración", "caverna"],
        Effect::Set(3),
    ),
    rule(
        Axis::Fisica,
        &["extrema", "adrenalina", "bungee", "clavados", "tiburón"],
        Effect::Set(4),
    ),
    rule(
        Axis::Fisica,
        &["museo", "restaurante", "playa", "descansar", "relajación"],
        Effect::AtMost(1),
    ),
    // vertigo
    rule(
        Axis::Vertigo,
        &["altura", "faro", "torre", "acantilado", "mirador"],
        Effect::Set(2),
    ),
    rule(
        Axis::Vertigo,
        &["tirolesa", "zipline", "clavados"],
        Effect::Set(3),
    ),
    rule(Axis::Vertigo, &["bungee", "columpio"], Effect::Set(4)),
    rule(
        Axis::Vertigo,
        &["profund", "submarino", "buceo", "cueva", "cenote cerrado"],
        Effect::AtLeast(1),
    ),
    // atletico
    rule(
        Axis::Atletico,
        &["caminar", "nadar", "snorkel"],
        Effect::Set(1),
    ),
    rule(
        Axis::Atletico,
        &["buceo", "exploración", "sendero", "bicicleta"],
        Effect::Set(2),
    ),
    rule(
        Axis::Atletico,
        &["tirolesa", "atv", "aventura", "circuito"],
        Effect::Set(2),
    ),
    rule(
        Axis::Atletico,
        &["extrema", "adrenalina", "certificado"],
        Effect::Set(3),
    ),
    rule(
        Axis::Atletico,
        &["tiburón toro", "avanzado", "profesional"],
        Effect::Set(4),
    ),
];

/// Derive the intensity profile of a place from its description and name.
pub fn classify(descripcion: &str, nombre: &str) -> Intensidad {
    let text = format!("{descripcion} {nombre}").to_lowercase();

    let (mut fisica, mut vertigo, mut atletico) = (0u8, 0u8, 0u8);
    for rule in RULES.iter().filter(|r| r.matches(&text)) {
        let slot = match rule.axis {
            Axis::Fisica => &mut fisica,
            Axis::Vertigo => &mut vertigo,
            Axis::Atletico => &mut atletico,
        };
        *slot = rule.effect.apply(*slot);
    }

    Intensidad::new(fisica, vertigo, atletico)
}

#[cfg(test)]
mod tests {
    use super::*;
    use destinos_shared::{Accesibilidad, MAX_LEVEL};

    fn triple(i: Intensidad) -> (u8, u8, u8) {
        (i.fisica(), i.vertigo(), i.atletico())
    }

    #[test]
    fn empty_text_is_zero_profile() {
        let i = classify("", "");
        assert_eq!(triple(i), (0, 0, 0));
        assert_eq!(i.accesibilidad(), Accesibilidad::Alta);
    }

    #[test]
    fn matching_is_case_insensitive_and_includes_name() {
        let i = classify("", "Tour de SNORKEL");
        assert_eq!(triple(i), (2, 0, 1));
    }

    #[test]
    fn later_rules_override_earlier_ones() {
        // nadar → 2, tirolesa → 3, adrenalina → 4
        let i = classify("nadar, tirolesa y mucha adrenalina", "Parque");
        assert_eq!(i.fisica(), 4);
        assert_eq!(i.vertigo(), 3);
        assert_eq!(i.atletico(), 3);
    }

    #[test]
    fn leisure_keywords_only_lower_fisica() {
        let i = classify("Playa con tirolesa", "");
        assert_eq!(i.fisica(), 1, "playa caps the tirolesa bump");

        let i = classify("Una playa tranquila", "");
        assert_eq!(i.fisica(), 0, "cap never raises");

        let i = classify("Museo de los clavados de La Quebrada", "");
        assert!(i.fisica() <= 1);
        assert_eq!(i.vertigo(), 3);

        let i = classify("Restaurante con vista al tiburón ballena", "");
        assert!(i.fisica() <= 1);
    }

    #[test]
    fn depth_keywords_only_raise_vertigo() {
        assert_eq!(classify("cueva submarina", "").vertigo(), 1);
        assert_eq!(
            classify("tirolesa sobre una cueva", "").vertigo(),
            3,
            "floor never lowers"
        );
    }

    #[test]
    fn shark_keyword_is_phrase_specific() {
        let i = classify("Nado con tiburón toro, nivel avanzado", "");
        assert_eq!(triple(i), (4, 0, 4));
        assert_eq!(i.accesibilidad(), Accesibilidad::Baja);
    }

    #[test]
    fn every_axis_stays_in_range() {
        let everything: String = RULES
            .iter()
            .flat_map(|r| r.keywords.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let i = classify(&everything, &everything);
        assert!(i.fisica() <= MAX_LEVEL);
        assert!(i.vertigo() <= MAX_LEVEL);
        assert!(i.atletico() <= MAX_LEVEL);
    }

    #[test]
    fn each_rule_fires_on_its_own_keywords() {
        for rule in RULES {
            for keyword in rule.keywords {
                assert!(rule.matches(keyword), "{keyword} should match its rule");
            }
        }
    }

    #[test]
    fn classify_is_deterministic() {
        let d = "Cenote con tirolesas y exploración de cavernas";
        assert_eq!(classify(d, "Ruta"), classify(d, "Ruta"));
    }
}
