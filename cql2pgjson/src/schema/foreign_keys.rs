// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::{HashSet, VecDeque};

use crate::schema::model::{Schema, Table};

/// One foreign key step of a join path: `table.field` holds the id of a row in `target_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyHop {
    /// Child table owning the foreign key.
    pub table: String,

    /// Dotted path of the foreign key field inside the child documents.
    pub field: String,

    /// Parent table the foreign key points at.
    pub target_table: String,
}

impl ForeignKeyHop {
    fn new(table: &str, field: &str, target_table: &str) -> Self {
        Self {
            table: table.to_string(),
            field: field.to_string(),
            target_table: target_table.to_string(),
        }
    }
}

impl Schema {
    /// Returns true if the name is a table name or a foreign key alias of this schema.
    pub fn is_table_or_alias(&self, name: &str) -> bool {
        self.tables.iter().any(|table| {
            table.table_name == name
                || table.foreign_keys.iter().any(|foreign_key| {
                    foreign_key.target_alias() == name || foreign_key.source_alias(table) == name
                })
        })
    }

    /// Resolves a table name or foreign key alias to the name of the table it addresses.
    pub fn table_for_alias(&self, alias: &str) -> Option<&str> {
        if let Some(table) = self.table(alias) {
            return Some(&table.table_name);
        }

        self.tables.iter().find_map(|table| {
            table.foreign_keys.iter().find_map(|foreign_key| {
                if foreign_key.target_alias() == alias {
                    Some(foreign_key.target_table.as_str())
                } else if foreign_key.source_alias(table) == alias {
                    Some(table.table_name.as_str())
                } else {
                    None
                }
            })
        })
    }

    /// Foreign keys of the given table as join hops.
    fn parents_of<'a>(&'a self, table: &'a Table) -> impl Iterator<Item = ForeignKeyHop> + 'a {
        table.foreign_keys.iter().map(move |foreign_key| {
            ForeignKeyHop::new(
                &table.table_name,
                &foreign_key.field_name,
                &foreign_key.target_table,
            )
        })
    }

    /// Shortest path following foreign keys from a child table up to the parent, ending with a
    /// foreign key whose target alias matches.
    ///
    /// Hops are ordered from the child table to the parent, the first hop starts at
    /// `source_table`.
    pub fn foreign_key_path_to_alias(
        &self,
        source_table: &str,
        alias: &str,
    ) -> Option<Vec<ForeignKeyHop>> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(source_table.to_string());
        queue.push_back((source_table.to_string(), Vec::new()));

        while let Some((table_name, path)) = queue.pop_front() {
            let table = match self.table(&table_name) {
                Some(table) => table,
                None => continue,
            };

            for foreign_key in &table.foreign_keys {
                let mut next_path: Vec<ForeignKeyHop> = path.clone();
                next_path.push(ForeignKeyHop::new(
                    &table.table_name,
                    &foreign_key.field_name,
                    &foreign_key.target_table,
                ));

                if foreign_key.target_alias() == alias {
                    return Some(next_path);
                }

                if visited.insert(foreign_key.target_table.clone()) {
                    queue.push_back((foreign_key.target_table.clone(), next_path));
                }
            }
        }

        None
    }

    /// Shortest path following foreign keys from a child table addressed by its alias up to the
    /// parent `target_table`.
    ///
    /// Hops are ordered from `target_table` down to the aliased child table, so the first hop
    /// points at `target_table` and the last hop starts at the child.
    pub fn foreign_key_path_from_alias(
        &self,
        alias: &str,
        target_table: &str,
    ) -> Option<Vec<ForeignKeyHop>> {
        let mut best: Option<Vec<ForeignKeyHop>> = None;

        for table in &self.tables {
            for foreign_key in &table.foreign_keys {
                if foreign_key.source_alias(table) != alias {
                    continue;
                }

                let first = ForeignKeyHop::new(
                    &table.table_name,
                    &foreign_key.field_name,
                    &foreign_key.target_table,
                );

                // Foreign key pointing directly at the target table always wins
                if foreign_key.target_table == target_table {
                    return Some(vec![first]);
                }

                let rest = match self.path_between(&foreign_key.target_table, target_table) {
                    Some(rest) => rest,
                    None => continue,
                };

                let mut path = vec![first];
                path.extend(rest);
                if best.as_ref().map_or(true, |best| path.len() < best.len()) {
                    best = Some(path);
                }
            }
        }

        best.map(|mut path| {
            path.reverse();
            path
        })
    }

    /// Shortest path of foreign keys from a child table up to a parent table.
    fn path_between(&self, child_table: &str, parent_table: &str) -> Option<Vec<ForeignKeyHop>> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(child_table.to_string());
        queue.push_back((child_table.to_string(), Vec::new()));

        while let Some((table_name, path)) = queue.pop_front() {
            let table = match self.table(&table_name) {
                Some(table) => table,
                None => continue,
            };

            for hop in self.parents_of(table) {
                let target_table = hop.target_table.clone();
                let mut next_path: Vec<ForeignKeyHop> = path.clone();
                next_path.push(hop);

                if target_table == parent_table {
                    return Some(next_path);
                }

                if visited.insert(target_table.clone()) {
                    queue.push_back((target_table, next_path));
                }
            }
        }

        None
    }
}
