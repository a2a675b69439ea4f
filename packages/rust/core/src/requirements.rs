//! Requirement generator: intensity profile + text → ordered visitor notes.
//!
//! [`GROUPS`] is evaluated top to bottom. Each group is a first-match list
//! of `(condition, text)` and contributes at most one string. Group order
//! fixes the output order: physical, emotional, skill, environment, time,
//! logistics, food.

use destinos_shared::{Intensidad, Place};

/// A requirement condition, evaluated against one place.
#[derive(Debug, Clone, Copy)]
pub enum Cond {
    Always,
    /// `fisica == n`
    Fisica(u8),
    /// `fisica >= n`
    FisicaAtLeast(u8),
    /// `vertigo >= n`
    VertigoAtLeast(u8),
    /// `atletico >= n`
    AtleticoAtLeast(u8),
    /// Any keyword occurs in the lowercased `descripcion`.
    Desc(&'static [&'static str]),
    /// Any keyword occurs in the lowercased `categoria`.
    Categoria(&'static [&'static str]),
    All(&'static [Cond]),
    Any(&'static [Cond]),
}

/// What a condition is evaluated against.
#[derive(Debug, Clone)]
pub struct Subject {
    pub intensidad: Intensidad,
    pub descripcion: String,
    pub categoria: String,
}

impl Subject {
    pub fn new(place: &Place, intensidad: Intensidad) -> Self {
        Self {
            intensidad,
            descripcion: place.descripcion.to_lowercase(),
            categoria: place.categoria.to_lowercase(),
        }
    }
}

impl Cond {
    pub fn eval(&self, s: &Subject) -> bool {
        match *self {
            Self::Always => true,
            Self::Fisica(n) => s.intensidad.fisica() == n,
            Self::FisicaAtLeast(n) => s.intensidad.fisica() >= n,
            Self::VertigoAtLeast(n) => s.intensidad.vertigo() >= n,
            Self::AtleticoAtLeast(n) => s.intensidad.atletico() >= n,
            Self::Desc(keywords) => keywords.iter().any(|k| s.descripcion.contains(k)),
            Self::Categoria(keywords) => keywords.iter().any(|k| s.categoria.contains(k)),
            Self::All(conds) => conds.iter().all(|c| c.eval(s)),
            Self::Any(conds) => conds.iter().any(|c| c.eval(s)),
        }
    }
}

/// A first-match rule group.
#[derive(Debug, Clone, Copy)]
pub struct Group {
    pub name: &'static str,
    pub branches: &'static [(Cond, &'static str)],
}

impl Group {
    /// Text of the first branch whose condition holds.
    pub fn select(&self, s: &Subject) -> Option<&'static str> {
        self.branches
            .iter()
            .find(|(cond, _)| cond.eval(s))
            .map(|(_, text)| *text)
    }
}

const FOOD: Cond = Cond::Categoria(&["restaurante", "gastronom"]);

/// The requirement table, in output order.
pub const GROUPS: &[Group] = &[
    Group {
        name: "physical",
        branches: &[
            (Cond::Fisica(0), "👌 Puedes ir en pijama - cero esfuerzo físico"),
            (Cond::Fisica(1), "🚶 Caminar tranquilo por 15-30 minutos"),
            (
                Cond::All(&[Cond::Fisica(2), Cond::Desc(&["snorkel", "nadar"])]),
                "🏊 Nadar/snorkelear por 30-60 minutos",
            ),
            (Cond::Fisica(2), "🚶 Caminar 1-2 horas, pausas incluidas"),
            (
                Cond::All(&[Cond::Fisica(3), Cond::Desc(&["buceo"])]),
                "🤿 Bucear 1-2 horas - certificación recomendada",
            ),
            (
                Cond::All(&[Cond::Fisica(3), Cond::Desc(&["cenote"])]),
                "💦 Nadar en cenote 1-2 horas, escaleras/rocas",
            ),
            (Cond::Fisica(3), "🏃 Actividad física moderada 2-3 horas"),
            (
                Cond::All(&[Cond::Fisica(4), Cond::Desc(&["tirolesa", "zipline"])]),
                "🎢 Circuito de tirolesas - resistencia y fuerza en brazos",
            ),
            (
                Cond::All(&[Cond::Fisica(4), Cond::Desc(&["atv"])]),
                "🏍️ Manejar ATV por terreno irregular - fuerza y coordinación",
            ),
            (Cond::Fisica(4), "💪 Alta energía - 3+ horas de actividad intensa"),
            (
                Cond::FisicaAtLeast(5),
                "🔥 Nivel atlético extremo - entrenamiento previo recomendado",
            ),
        ],
    },
    Group {
        name: "height",
        branches: &[
            (
                Cond::All(&[Cond::VertigoAtLeast(3), Cond::Desc(&["tirolesa"])]),
                "🎢 Alturas de 10-30 metros - no apto si tienes miedo a las alturas",
            ),
            (
                Cond::All(&[Cond::VertigoAtLeast(3), Cond::Desc(&["acantilado", "mirador"])]),
                "🏔️ Vistas desde acantilados - puede dar vértigo",
            ),
            (
                Cond::All(&[Cond::VertigoAtLeast(3), Cond::Desc(&["faro"])]),
                "🗼 Subir torre/faro - escaleras empinadas",
            ),
        ],
    },
    Group {
        name: "jumps",
        branches: &[(
            Cond::Desc(&["clavados", "salto"]),
            "🤸 Plataformas de salto disponibles (opcionales)",
        )],
    },
    Group {
        name: "skill",
        branches: &[
            (
                Cond::All(&[
                    Cond::AtleticoAtLeast(3),
                    Cond::Desc(&["buceo"]),
                    Cond::Desc(&["certificado", "certificación"]),
                ]),
                "📜 Certificación de buceo REQUERIDA",
            ),
            (
                Cond::All(&[Cond::AtleticoAtLeast(3), Cond::Desc(&["buceo"])]),
                "🤿 Experiencia en buceo recomendada",
            ),
            (
                Cond::All(&[Cond::AtleticoAtLeast(3), Cond::Desc(&["tiburón"])]),
                "🦈 Experiencia de snorkel/buceo + no tener miedo",
            ),
        ],
    },
    Group {
        name: "sun",
        branches: &[(
            Cond::Any(&[Cond::Desc(&["sol"]), Cond::Categoria(&["playa"])]),
            "☀️ Protector solar obligatorio - sol caribeño fuerte",
        )],
    },
    Group {
        name: "cold water",
        branches: &[(
            Cond::Desc(&["cenote"]),
            "🧊 Agua fría (22-25°C) - wetsuit opcional pero ayuda",
        )],
    },
    Group {
        name: "duration",
        branches: &[
            (
                Cond::Desc(&["día completo", "full day"]),
                "🕐 Día completo (6-8 horas)",
            ),
            (
                Cond::Desc(&["medio día", "half day"]),
                "🕐 Medio día (3-4 horas)",
            ),
            (
                Cond::Categoria(&["tour"]),
                "🕐 Duración: 2-4 horas típicamente",
            ),
        ],
    },
    Group {
        name: "boat",
        branches: &[(
            Cond::Desc(&["lancha", "barco", "ferry"]),
            "⛵ Transporte en lancha/barco incluido",
        )],
    },
    Group {
        name: "reservation",
        branches: &[(
            Cond::Desc(&["reserva", "tour", "tirolesa", "atv"]),
            "📅 Reservación anticipada recomendada",
        )],
    },
    Group {
        name: "spice",
        branches: &[(
            Cond::All(&[FOOD, Cond::Desc(&["picante", "habanero"])]),
            "🌶️ Comida puede ser picante - pide 'sin chile' si prefieres",
        )],
    },
    Group {
        name: "cost",
        branches: &[
            (
                Cond::All(&[FOOD, Cond::Desc(&["precio", "económico"])]),
                "💰 Económico - menos de $200 MXN por persona",
            ),
            (
                Cond::All(&[FOOD, Cond::Desc(&["gourmet", "exclusiv"])]),
                "💰💰 Precio alto - $500+ MXN por persona",
            ),
        ],
    },
];

/// Build the requirement list for `place` given its classified profile.
pub fn generate(place: &Place, intensidad: Intensidad) -> Vec<String> {
    let subject = Subject::new(place, intensidad);
    let mut out: Vec<String> = Vec::new();
    for text in GROUPS.iter().filter_map(|g| g.select(&subject)) {
        if !out.iter().any(|existing| existing == text) {
            out.push(text.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(descripcion: &str, categoria: &str) -> Place {
        Place::new("Lugar", descripcion).with_categoria(categoria)
    }

    #[test]
    fn physical_note_is_always_present() {
        for f in 0..=5 {
            let reqs = generate(&place("", ""), Intensidad::new(f, 0, 0));
            assert_eq!(reqs.len(), 1, "fisica {f}");
        }
        let reqs = generate(&place("", ""), Intensidad::default());
        assert_eq!(reqs, vec!["👌 Puedes ir en pijama - cero esfuerzo físico"]);
    }

    #[test]
    fn physical_branches_follow_description() {
        let swim = generate(&place("Ideal para snorkel", ""), Intensidad::new(2, 0, 1));
        assert_eq!(swim[0], "🏊 Nadar/snorkelear por 30-60 minutos");

        let walk = generate(&place("Sendero largo", ""), Intensidad::new(2, 0, 2));
        assert_eq!(walk[0], "🚶 Caminar 1-2 horas, pausas incluidas");

        let atv = generate(&place("Recorrido en ATV", ""), Intensidad::new(4, 0, 2));
        assert_eq!(
            atv[0],
            "🏍️ Manejar ATV por terreno irregular - fuerza y coordinación"
        );
    }

    #[test]
    fn height_note_requires_vertigo_three() {
        let low = generate(&place("Mirador", ""), Intensidad::new(0, 2, 0));
        assert!(!low.iter().any(|r| r.contains("acantilados")));

        let high = generate(&place("Mirador al acantilado", ""), Intensidad::new(1, 3, 0));
        assert!(high.contains(&"🏔️ Vistas desde acantilados - puede dar vértigo".to_string()));
    }

    #[test]
    fn certification_beats_experience() {
        let reqs = generate(
            &place("Buceo con certificado avanzado", ""),
            Intensidad::new(2, 1, 4),
        );
        assert!(reqs.contains(&"📜 Certificación de buceo REQUERIDA".to_string()));
        assert!(!reqs.contains(&"🤿 Experiencia en buceo recomendada".to_string()));
    }

    #[test]
    fn sun_from_category_and_cold_water_from_cenote() {
        let reqs = generate(&place("Arena blanca", "playas"), Intensidad::default());
        assert!(reqs.iter().any(|r| r.starts_with("☀️")));

        let reqs = generate(&place("Un cenote abierto", "cenotes"), Intensidad::new(2, 0, 1));
        assert!(reqs.iter().any(|r| r.starts_with("🧊")));
    }

    #[test]
    fn duration_prefers_full_day() {
        let reqs = generate(
            &place("Excursión de día completo o medio día", "tours"),
            Intensidad::new(1, 0, 0),
        );
        let durations: Vec<_> = reqs.iter().filter(|r| r.starts_with("🕐")).collect();
        assert_eq!(durations, vec!["🕐 Día completo (6-8 horas)"]);
    }

    #[test]
    fn food_notes_only_for_food_categories() {
        let desc = "Salsa de habanero, buen precio";
        let outside = generate(&place(desc, "playas"), Intensidad::default());
        assert!(!outside.iter().any(|r| r.starts_with("🌶️") || r.starts_with("💰")));

        let inside = generate(&place(desc, "gastronomia"), Intensidad::default());
        assert_eq!(
            &inside[inside.len() - 2..],
            &[
                "🌶️ Comida puede ser picante - pide 'sin chile' si prefieres".to_string(),
                "💰 Económico - menos de $200 MXN por persona".to_string(),
            ]
        );
    }

    #[test]
    fn output_follows_group_order() {
        let reqs = generate(
            &place(
                "Cenote con tirolesa, llegada en lancha, reserva previa",
                "aventura",
            ),
            Intensidad::new(3, 3, 2),
        );
        assert_eq!(
            reqs,
            vec![
                "💦 Nadar en cenote 1-2 horas, escaleras/rocas",
                "🎢 Alturas de 10-30 metros - no apto si tienes miedo a las alturas",
                "🧊 Agua fría (22-25°C) - wetsuit opcional pero ayuda",
                "⛵ Transporte en lancha/barco incluido",
                "📅 Reservación anticipada recomendada",
            ]
        );
    }

    #[test]
    fn generate_is_deterministic() {
        let p = place("Faro con clavados y sol", "playas");
        let i = Intensidad::new(4, 3, 2);
        assert_eq!(generate(&p, i), generate(&p, i));
    }
}
