use crate::index::SkillIndex;
use crate::models::{NodeRole, SkillExtract};

/// Maps a verified alias to the skill records it counts toward.
///
/// Unknown aliases name themselves. An individual counts toward each of its
/// declared categories; a class counts toward itself under the matched alias.
pub fn fold(index: &SkillIndex, alias: &str, count: u32) -> Vec<SkillExtract> {
    match index.resolve(alias) {
        None => vec![SkillExtract::new(alias, alias, count)],
        Some(node) => match node.role {
            NodeRole::Individual => node
                .parents
                .iter()
                .map(|parent| SkillExtract::new(parent.as_str(), alias, count))
                .collect(),
            NodeRole::Class => vec![SkillExtract::new(alias, alias, count)],
        },
    }
}
