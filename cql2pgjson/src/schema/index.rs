// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::schema::model::{ForeignKey, Index, Schema, Table};

fn find_index<'a>(indexes: &'a [Index], index_name: &str) -> Option<&'a Index> {
    indexes.iter().find(|index| index.field_name == index_name)
}

/// All indexes declared for one field of a table.
///
/// Collected once per term so the compiler does not need to search through the index lists of
/// the table repeatedly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DbIndex<'a> {
    /// Index using `text_pattern_ops`.
    pub like_index: Option<&'a Index>,

    /// Unique b-tree index.
    pub unique_index: Option<&'a Index>,

    /// Non-unique b-tree index.
    pub index: Option<&'a Index>,

    /// Index using `gin_trgm_ops` trigram matching.
    pub gin_index: Option<&'a Index>,

    /// Index using `tsvector` full text search.
    pub full_text_index: Option<&'a Index>,
}

impl<'a> DbIndex<'a> {
    /// Looks up the indexes of a field, returns an empty set when the table is unknown.
    pub fn new(table: Option<&'a Table>, index_name: &str) -> Self {
        match table {
            Some(table) => Self {
                like_index: find_index(&table.like_index, index_name),
                unique_index: find_index(&table.unique_index, index_name),
                index: find_index(&table.index, index_name),
                gin_index: find_index(&table.gin_index, index_name),
                full_text_index: find_index(&table.full_text_index, index_name),
            },
            None => Self::default(),
        }
    }

    /// Returns true if a `tsvector` full text index exists.
    pub fn has_full_text_index(&self) -> bool {
        self.full_text_index.is_some()
    }

    /// Returns true if a trigram index exists.
    pub fn has_gin_index(&self) -> bool {
        self.gin_index.is_some()
    }

    /// Returns true if a `text_pattern_ops` index exists.
    pub fn has_like_index(&self) -> bool {
        self.like_index.is_some()
    }

    /// Returns true if any b-tree index (plain, unique or pattern) exists.
    pub fn has_other_index(&self) -> bool {
        self.other_index().is_some()
    }

    /// Index used for pattern matching, trigram indexes are preferred.
    pub fn pattern_index(&self) -> Option<&'a Index> {
        self.gin_index
            .or(self.like_index)
            .or(self.unique_index)
            .or(self.index)
    }

    /// Index used for plain comparisons.
    pub fn other_index(&self) -> Option<&'a Index> {
        self.index.or(self.unique_index).or(self.like_index)
    }

    fn all(&self) -> impl Iterator<Item = &'a Index> {
        vec![
            self.full_text_index,
            self.gin_index,
            self.like_index,
            self.unique_index,
            self.index,
        ]
        .into_iter()
        .flatten()
    }

    /// Looks up an array relation modifier (name without `@`), returns the declared modifier name
    /// and the subfield of the array elements the search term is compared with.
    ///
    /// Without a declared subfield the term is compared with the element field named like the
    /// modifier.
    pub fn array_modifier(&self, name: &str) -> Option<(&'a str, &'a str)> {
        self.all().find_map(|index| {
            index
                .array_modifiers
                .iter()
                .find(|modifier| modifier.eq_ignore_ascii_case(name))
                .map(|modifier| {
                    let subfield = index.array_subfield.as_deref().unwrap_or(modifier);
                    (modifier.as_str(), subfield)
                })
        })
    }

    /// First index declared as compound or SQL expression index.
    pub fn expression_index(&self) -> Option<&'a Index> {
        self.all()
            .find(|index| index.multi_field_names.is_some() || index.sql_expression.is_some())
    }
}

impl Schema {
    /// Returns the indexes declared for a field of a table.
    pub fn db_index(&self, table_name: &str, index_name: &str) -> DbIndex<'_> {
        DbIndex::new(self.table(table_name), index_name)
    }

    /// Returns true if the field has a full text index.
    pub fn has_full_text_index(&self, table_name: &str, index_name: &str) -> bool {
        self.db_index(table_name, index_name).has_full_text_index()
    }

    /// Returns true if the field has a trigram index.
    pub fn has_gin_index(&self, table_name: &str, index_name: &str) -> bool {
        self.db_index(table_name, index_name).has_gin_index()
    }

    /// Returns true if the field has a b-tree index.
    pub fn has_other_index(&self, table_name: &str, index_name: &str) -> bool {
        self.db_index(table_name, index_name).has_other_index()
    }

    /// Returns the foreign key of the child table pointing at the parent table.
    pub fn find_foreign_key(&self, child_table: &str, parent_table: &str) -> Option<&ForeignKey> {
        self.table(child_table)?
            .foreign_keys
            .iter()
            .find(|foreign_key| foreign_key.target_table == parent_table)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::schema::Schema;

    fn schema() -> Schema {
        Schema::from_json(
            r#"{
                "tables": [
                    {
                        "tableName": "users",
                        "fullTextIndex": [{ "fieldName": "name" }],
                        "ginIndex": [{ "fieldName": "name", "caseSensitive": true }],
                        "likeIndex": [{ "fieldName": "barcode" }],
                        "uniqueIndex": [{ "fieldName": "username" }],
                        "index": [
                            { "fieldName": "barcode", "removeAccents": false },
                            {
                                "fieldName": "identifiers",
                                "arraySubfield": "value",
                                "arrayModifiers": ["identifierTypeId", "type"]
                            },
                            { "fieldName": "tags", "arrayModifiers": ["label"] },
                            { "fieldName": "fullname", "multiFieldNames": "first,last" }
                        ],
                        "foreignKeys": [{ "fieldName": "groupId", "targetTable": "groups" }]
                    },
                    { "tableName": "groups" }
                ]
            }"#,
        )
        .unwrap()
    }

    #[rstest]
    #[case::full_text_and_gin("name", true, true, false)]
    #[case::like_and_plain("barcode", false, false, true)]
    #[case::unique("username", false, false, true)]
    #[case::unknown("email", false, false, false)]
    fn index_lookup(
        #[case] field: &str,
        #[case] full_text: bool,
        #[case] gin: bool,
        #[case] other: bool,
    ) {
        let schema = schema();

        assert_eq!(schema.has_full_text_index("users", field), full_text);
        assert_eq!(schema.has_gin_index("users", field), gin);
        assert_eq!(schema.has_other_index("users", field), other);
    }

    #[test]
    fn unknown_table_has_no_indexes() {
        let schema = schema();
        let db_index = schema.db_index("unknown", "name");

        assert!(!db_index.has_full_text_index());
        assert!(db_index.pattern_index().is_none());
    }

    #[test]
    fn pattern_index_prefers_gin() {
        let schema = schema();

        let name = schema.db_index("users", "name");
        assert!(name.pattern_index().unwrap().case_sensitive);

        // Like index comes before the plain index
        let barcode = schema.db_index("users", "barcode");
        assert!(barcode.pattern_index().unwrap().remove_accents);
        assert!(!barcode.other_index().unwrap().remove_accents);
    }

    #[test]
    fn array_modifiers() {
        let schema = schema();
        let db_index = schema.db_index("users", "identifiers");

        assert_eq!(
            db_index.array_modifier("identifiertypeid"),
            Some(("identifierTypeId", "value"))
        );
        assert_eq!(db_index.array_modifier("type"), Some(("type", "value")));
        assert_eq!(db_index.array_modifier("other"), None);

        let tags = schema.db_index("users", "tags");
        assert_eq!(tags.array_modifier("LABEL"), Some(("label", "label")));
    }

    #[test]
    fn expression_indexes() {
        let schema = schema();

        assert!(schema.db_index("users", "fullname").expression_index().is_some());
        assert!(schema.db_index("users", "name").expression_index().is_none());
    }

    #[test]
    fn foreign_keys() {
        let schema = schema();

        assert_eq!(
            schema.find_foreign_key("users", "groups").unwrap().field_name,
            "groupId"
        );
        assert!(schema.find_foreign_key("groups", "users").is_none());
    }
}
