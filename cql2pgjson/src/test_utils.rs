// SPDX-License-Identifier: AGPL-3.0-or-later

//! Schema fixtures shared by the tests of all modules.
use std::sync::Arc;

use ctor::ctor;
use rstest::fixture;

use crate::schema::Schema;

/// Prints the generated SQL of failing tests when run with `RUST_LOG=cql2pgjson=debug`.
#[ctor]
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn schema_from_json(json: &str) -> Schema {
    Schema::from_json(json).expect("Invalid test schema")
}

/// Three tables `tablea` <- `tableb` <- `tablec` linked by foreign keys.
///
/// `tableb` declares indexes of every category on different fields.
#[fixture]
pub fn foreign_key_schema() -> Schema {
    schema_from_json(
        r#"{
            "tables": [
                {
                    "tableName": "tablea",
                    "ginIndex": [{ "fieldName": "prefix" }]
                },
                {
                    "tableName": "tableb",
                    "foreignKeys": [{ "fieldName": "tableaId", "targetTable": "tablea" }],
                    "ginIndex": [
                        { "fieldName": "prefix" },
                        { "fieldName": "gprefix", "removeAccents": false }
                    ],
                    "fullTextIndex": [{ "fieldName": "ftprefix", "removeAccents": false }],
                    "index": [{ "fieldName": "otherindex" }]
                },
                {
                    "tableName": "tablec",
                    "foreignKeys": [{ "fieldName": "tablebId", "targetTable": "tableb" }],
                    "ginIndex": [{ "fieldName": "cindex" }]
                }
            ]
        }"#,
    )
}

/// Inventory tables `instance` <- `holdings_record` <- `item`.
#[fixture]
pub fn subquery_schema() -> Schema {
    schema_from_json(
        r#"{
            "tables": [
                {
                    "tableName": "instance",
                    "fullTextIndex": [{ "fieldName": "title" }],
                    "index": [
                        {
                            "fieldName": "identifiers",
                            "arraySubfield": "value",
                            "arrayModifiers": ["identifierTypeId"]
                        }
                    ]
                },
                {
                    "tableName": "holdings_record",
                    "foreignKeys": [{ "fieldName": "instanceId", "targetTable": "instance" }]
                },
                {
                    "tableName": "item",
                    "foreignKeys": [
                        { "fieldName": "holdingsRecordId", "targetTable": "holdings_record" }
                    ],
                    "ginIndex": [{ "fieldName": "barcode" }]
                }
            ]
        }"#,
    )
}

/// Users table with differently folded indexes and a numeric field.
#[fixture]
pub fn users_schema() -> Schema {
    schema_from_json(
        r#"{
            "tables": [
                {
                    "tableName": "users",
                    "ginIndex": [
                        { "fieldName": "a", "caseSensitive": true, "removeAccents": false },
                        { "fieldName": "b", "removeAccents": false },
                        { "fieldName": "c" }
                    ],
                    "fullTextIndex": [
                        { "fieldName": "name" },
                        { "fieldName": "code", "removeAccents": false }
                    ],
                    "uniqueIndex": [{ "fieldName": "username" }],
                    "index": [{ "fieldName": "age", "stringType": false }],
                    "likeIndex": [
                        { "fieldName": "fullname", "multiFieldNames": "firstName,lastName" },
                        {
                            "fieldName": "city",
                            "sqlExpression": "translate(jsonb->>'city', 'aeiou', '')",
                            "removeAccents": false,
                            "caseSensitive": true
                        }
                    ]
                }
            ]
        }"#,
    )
}

/// Organisations referencing their parent organisation and users referencing their
/// organisation, both addressed through aliases.
#[fixture]
pub fn aliased_schema() -> Schema {
    schema_from_json(
        r#"{
            "tables": [
                {
                    "tableName": "organisations",
                    "foreignKeys": [
                        {
                            "fieldName": "parentId",
                            "targetTable": "organisations",
                            "targetTableAlias": "parentOrg",
                            "tableAlias": "childOrgs"
                        }
                    ]
                },
                {
                    "tableName": "users",
                    "foreignKeys": [
                        {
                            "fieldName": "organisationId",
                            "targetTable": "organisations",
                            "targetTableAlias": "organisation",
                            "tableAlias": "members"
                        }
                    ]
                }
            ]
        }"#,
    )
}

/// Shared handle of the foreign key schema.
#[fixture]
pub fn shared_foreign_key_schema(foreign_key_schema: Schema) -> Arc<Schema> {
    Arc::new(foreign_key_schema)
}
