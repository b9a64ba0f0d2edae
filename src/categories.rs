// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Grouping of point-of-interest category ids.

use std::collections::HashMap;
use std::io::BufRead;
use std::str::FromStr;

/// Error conditions when parsing a category table.
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: &'static str },

    #[error("duplicate category group id {0}")]
    DuplicateGroup(i32),

    #[error("category ranges of groups {0} and {1} overlap")]
    OverlappingGroups(i32, i32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A named group of categories, covering a contiguous range of category ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub id: i32,
    pub name: String,

    /// Tag value and category id of every category, in file order.
    pub categories: Vec<(String, u32)>,
}

impl CategoryGroup {
    /// Returns the smallest and largest category ids of the group,
    /// or `None` for groups without categories.
    pub fn category_range(&self) -> Option<(u32, u32)> {
        let min = self.categories.iter().map(|&(_, id)| id).min()?;
        let max = self.categories.iter().map(|&(_, id)| id).max()?;
        Some((min, max))
    }
}

/// Maps category ids to [CategoryGroups](CategoryGroup).
///
/// The classifier is parsed from a tab-separated table, where `#Name\t...\tgroup_id`
/// lines start a new group, and `tag\tvalue\tcategory_id` lines add categories
/// to the last group. Every category id between the smallest and largest id of a group
/// belongs to that group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryClassifier {
    groups: Vec<CategoryGroup>,

    /// `(min category id, max category id, group index)`, sorted and non-overlapping
    ranges: Vec<(u32, u32, usize)>,
    groups_by_id: HashMap<i32, usize>,
}

impl CategoryClassifier {
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, CategoryError> {
        let mut groups: Vec<CategoryGroup> = Vec::default();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let malformed = |reason| CategoryError::Malformed { line: i + 1, reason };

            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if let Some(name) = fields[0].strip_prefix('#') {
                if fields.len() < 3 {
                    return Err(malformed("group header needs 3 fields"));
                }
                let id = fields[2].parse().map_err(|_| malformed("invalid group id"))?;
                groups.push(CategoryGroup {
                    id,
                    name: name.trim().to_string(),
                    categories: Vec::default(),
                });
            } else {
                if fields.len() != 3 {
                    return Err(malformed("category needs 3 fields"));
                }
                let id = fields[2]
                    .parse()
                    .map_err(|_| malformed("invalid category id"))?;
                let group = groups
                    .last_mut()
                    .ok_or_else(|| malformed("category outside of a group"))?;
                group.categories.push((fields[1].to_string(), id));
            }
        }

        Self::from_groups(groups)
    }

    /// Creates a classifier from already parsed groups.
    pub fn from_groups(groups: Vec<CategoryGroup>) -> Result<Self, CategoryError> {
        let mut groups_by_id = HashMap::default();
        for (idx, g) in groups.iter().enumerate() {
            if groups_by_id.insert(g.id, idx).is_some() {
                return Err(CategoryError::DuplicateGroup(g.id));
            }
        }

        let mut ranges: Vec<(u32, u32, usize)> = groups
            .iter()
            .enumerate()
            .filter_map(|(idx, g)| g.category_range().map(|(min, max)| (min, max, idx)))
            .collect();
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            let (_, prev_max, prev) = pair[0];
            let (next_min, _, next) = pair[1];
            if next_min <= prev_max {
                let (a, b) = (groups[prev].id, groups[next].id);
                return Err(CategoryError::OverlappingGroups(a.min(b), a.max(b)));
            }
        }

        log::debug!("loaded {} category groups", groups.len());
        Ok(Self {
            groups,
            ranges,
            groups_by_id,
        })
    }

    pub fn groups_count(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    /// Returns the index of the group containing the category.
    pub fn group_index(&self, category_id: u32) -> Option<usize> {
        let i = self
            .ranges
            .partition_point(|&(min, _, _)| min <= category_id)
            .checked_sub(1)?;
        let (_, max, idx) = self.ranges[i];
        (category_id <= max).then_some(idx)
    }

    pub fn group_name(&self, group_index: usize) -> Option<&str> {
        self.groups.get(group_index).map(|g| g.name.as_str())
    }

    pub fn group_id(&self, group_index: usize) -> Option<i32> {
        self.groups.get(group_index).map(|g| g.id)
    }

    pub fn group_by_id(&self, group_id: i32) -> Option<&CategoryGroup> {
        self.groups_by_id.get(&group_id).map(|&idx| &self.groups[idx])
    }
}

impl FromStr for CategoryClassifier {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}
