use std::collections::BTreeSet;

use crate::exam::catalog::{Catalog, Part, PartId};
use crate::exam::skill::Skill;

/// Ordered view over the catalog's parts.
pub struct PartNavigator<'a> {
    catalog: &'a Catalog,
}

impl<'a> PartNavigator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn all_parts(&self) -> &'a [Part] {
        self.catalog.parts()
    }

    pub fn first_part(&self) -> &'a Part {
        // Catalog construction rejects empty catalogs.
        &self.catalog.parts()[0]
    }

    fn index_of(&self, id: &PartId) -> Option<usize> {
        self.all_parts().iter().position(|p| &p.id == id)
    }

    pub fn part(&self, id: &PartId) -> Option<&'a Part> {
        self.catalog.part(id)
    }

    pub fn skill_of(&self, id: &PartId) -> Option<Skill> {
        self.part(id).map(|p| p.skill)
    }

    /// The part immediately after `current`, or `None` when `current` is last.
    pub fn next_part(&self, current: &PartId) -> Option<&'a Part> {
        let idx = self.index_of(current)?;
        self.all_parts().get(idx + 1)
    }

    /// Like `next_part`, but never yields a part of a completed skill.
    pub fn next_reachable(
        &self,
        current: &PartId,
        completed: &BTreeSet<Skill>,
    ) -> Option<&'a Part> {
        let idx = self.index_of(current)?;
        self.all_parts()[idx + 1..]
            .iter()
            .find(|p| !completed.contains(&p.skill))
    }

    pub fn is_reachable(&self, id: &PartId, completed: &BTreeSet<Skill>) -> bool {
        self.skill_of(id)
            .is_some_and(|skill| !completed.contains(&skill))
    }

    pub fn is_first_of_skill(&self, id: &PartId) -> bool {
        self.part(id).is_some_and(|p| p.ordinal == 1)
    }

    pub fn is_last_of_skill(&self, id: &PartId) -> bool {
        match (self.part(id), self.next_part(id)) {
            (Some(_), None) => true,
            (Some(part), Some(next)) => next.skill != part.skill,
            (None, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::catalog::tests::small_catalog;

    #[test]
    fn next_part_walks_catalog_order() {
        let catalog = small_catalog();
        let nav = PartNavigator::new(&catalog);
        assert_eq!(nav.first_part().id.as_str(), "L1");
        assert_eq!(nav.next_part(&"L2".into()).unwrap().id.as_str(), "R1");
        assert_eq!(nav.next_part(&"W2".into()).unwrap().id.as_str(), "S1");
        assert!(nav.next_part(&"S3".into()).is_none());
        assert!(nav.next_part(&"X9".into()).is_none());
    }

    #[test]
    fn skill_of_resolves_owner() {
        let catalog = small_catalog();
        let nav = PartNavigator::new(&catalog);
        assert_eq!(nav.skill_of(&"R2".into()), Some(Skill::Reading));
        assert_eq!(nav.skill_of(&"S1".into()), Some(Skill::Speaking));
        assert_eq!(nav.skill_of(&"Q1".into()), None);
    }

    #[test]
    fn completed_skills_are_never_reachable() {
        let catalog = small_catalog();
        let nav = PartNavigator::new(&catalog);
        let completed: BTreeSet<Skill> = [Skill::Listening, Skill::Reading].into();

        for part in nav.all_parts() {
            if completed.contains(&part.skill) {
                assert!(!nav.is_reachable(&part.id, &completed));
            }
            if let Some(next) = nav.next_reachable(&part.id, &completed) {
                assert!(!completed.contains(&next.skill));
            }
        }
        let reachable: Vec<&str> = nav
            .all_parts()
            .iter()
            .filter(|p| nav.is_reachable(&p.id, &completed))
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(reachable, ["W1", "W2", "S1", "S2", "S3"]);
    }

    #[test]
    fn skill_boundaries() {
        let catalog = small_catalog();
        let nav = PartNavigator::new(&catalog);
        assert!(nav.is_first_of_skill(&"S1".into()));
        assert!(!nav.is_first_of_skill(&"S2".into()));
        assert!(nav.is_last_of_skill(&"L2".into()));
        assert!(nav.is_last_of_skill(&"S3".into()));
        assert!(!nav.is_last_of_skill(&"W1".into()));
    }
}
