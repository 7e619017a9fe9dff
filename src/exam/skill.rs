use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Listening,
    Reading,
    Writing,
    Speaking,
}

impl Skill {
    /// Exam order. Catalogs must list skill groups in this order.
    pub fn all() -> &'static [Skill] {
        &[
            Skill::Listening,
            Skill::Reading,
            Skill::Writing,
            Skill::Speaking,
        ]
    }

    /// Leading character of every part id belonging to this skill.
    pub fn part_prefix(self) -> char {
        match self {
            Skill::Listening => 'L',
            Skill::Reading => 'R',
            Skill::Writing => 'W',
            Skill::Speaking => 'S',
        }
    }

    /// Listening and Reading parts are question-counted before advancing.
    pub fn is_gated(self) -> bool {
        matches!(self, Skill::Listening | Skill::Reading)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Skill::Listening => "Listening",
            Skill::Reading => "Reading",
            Skill::Writing => "Writing",
            Skill::Speaking => "Speaking",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keys_are_lowercase_names() {
        for &skill in Skill::all() {
            let key = serde_json::to_string(&skill).unwrap();
            assert_eq!(key, format!("\"{}\"", skill.display_name().to_lowercase()));
            assert_eq!(serde_json::from_str::<Skill>(&key).unwrap(), skill);
        }
        assert!(serde_json::from_str::<Skill>("\"grammar\"").is_err());
    }

    #[test]
    fn only_objective_skills_are_gated() {
        assert!(Skill::Listening.is_gated());
        assert!(Skill::Reading.is_gated());
        assert!(!Skill::Writing.is_gated());
        assert!(!Skill::Speaking.is_gated());
    }

    #[test]
    fn ordering_follows_exam_order() {
        let mut shuffled = vec![Skill::Speaking, Skill::Listening, Skill::Writing, Skill::Reading];
        shuffled.sort();
        assert_eq!(shuffled, Skill::all());
    }
}
