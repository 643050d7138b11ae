//! SQLite statement templates.
//!
//! SQLite cannot change a column type in place, so the upgrades that widen
//! columns rebuild the users table and copy the rows across.

use super::{Dialect, Migration, SchemaScripts};

const CREATE_USERS_SQL: &str = r#"CREATE TABLE "{{users}}" (
    "id" integer NOT NULL PRIMARY KEY AUTOINCREMENT,
    "username" varchar(255) NOT NULL UNIQUE,
    "password" varchar(255) NULL,
    "public_keys" text NULL,
    "home_dir" varchar(255) NOT NULL,
    "uid" integer NOT NULL,
    "gid" integer NOT NULL,
    "max_sessions" integer NOT NULL,
    "quota_size" bigint NOT NULL,
    "quota_files" integer NOT NULL,
    "permissions" text NOT NULL,
    "used_quota_size" bigint NOT NULL,
    "used_quota_files" integer NOT NULL,
    "last_quota_update" bigint NOT NULL,
    "upload_bandwidth" integer NOT NULL,
    "download_bandwidth" integer NOT NULL,
    "expiration_date" bigint NOT NULL,
    "last_login" bigint NOT NULL,
    "status" integer NOT NULL,
    "filters" text NULL,
    "filesystem" text NULL
)"#;

const CREATE_SCHEMA_VERSION_SQL: &str = r#"CREATE TABLE "{{schema_version}}" (
    "id" integer NOT NULL PRIMARY KEY AUTOINCREMENT,
    "version" integer NOT NULL
)"#;

// ========================================
// Version 1 → 2
// ========================================

const UPGRADE_1_TO_2_SQL: &[&str] =
    &[r#"ALTER TABLE "{{users}}" ADD COLUMN "virtual_folders" text NULL"#];

// ========================================
// Version 2 → 3: password becomes text
// ========================================

const UPGRADE_2_TO_3_SQL: &[&str] = &[
    r#"CREATE TABLE "new__{{users}}" (
    "id" integer NOT NULL PRIMARY KEY AUTOINCREMENT,
    "username" varchar(255) NOT NULL UNIQUE,
    "password" text NULL,
    "public_keys" text NULL,
    "home_dir" varchar(255) NOT NULL,
    "uid" integer NOT NULL,
    "gid" integer NOT NULL,
    "max_sessions" integer NOT NULL,
    "quota_size" bigint NOT NULL,
    "quota_files" integer NOT NULL,
    "permissions" text NOT NULL,
    "used_quota_size" bigint NOT NULL,
    "used_quota_files" integer NOT NULL,
    "last_quota_update" bigint NOT NULL,
    "upload_bandwidth" integer NOT NULL,
    "download_bandwidth" integer NOT NULL,
    "expiration_date" bigint NOT NULL,
    "last_login" bigint NOT NULL,
    "status" integer NOT NULL,
    "filters" text NULL,
    "filesystem" text NULL,
    "virtual_folders" text NULL
)"#,
    r#"INSERT INTO "new__{{users}}" ("id", "username", "password", "public_keys", "home_dir", "uid", "gid",
    "max_sessions", "quota_size", "quota_files", "permissions", "used_quota_size", "used_quota_files",
    "last_quota_update", "upload_bandwidth", "download_bandwidth", "expiration_date", "last_login",
    "status", "filters", "filesystem", "virtual_folders")
SELECT "id", "username", "password", "public_keys", "home_dir", "uid", "gid",
    "max_sessions", "quota_size", "quota_files", "permissions", "used_quota_size", "used_quota_files",
    "last_quota_update", "upload_bandwidth", "download_bandwidth", "expiration_date", "last_login",
    "status", "filters", "filesystem", "virtual_folders"
FROM "{{users}}""#,
    r#"DROP TABLE "{{users}}""#,
    r#"ALTER TABLE "new__{{users}}" RENAME TO "{{users}}""#,
];

// ========================================
// Version 3 → 4: folders and folder mappings
// ========================================

const UPGRADE_3_TO_4_SQL: &[&str] = &[
    r#"CREATE TABLE "{{folders}}" (
    "id" integer NOT NULL PRIMARY KEY AUTOINCREMENT,
    "path" varchar(512) NOT NULL UNIQUE,
    "used_quota_size" bigint NOT NULL,
    "used_quota_files" integer NOT NULL,
    "last_quota_update" bigint NOT NULL
)"#,
    // home_dir widens to 512 and virtual_folders is dropped
    r#"CREATE TABLE "new__{{users}}" (
    "id" integer NOT NULL PRIMARY KEY AUTOINCREMENT,
    "username" varchar(255) NOT NULL UNIQUE,
    "password" text NULL,
    "public_keys" text NULL,
    "home_dir" varchar(512) NOT NULL,
    "uid" integer NOT NULL,
    "gid" integer NOT NULL,
    "max_sessions" integer NOT NULL,
    "quota_size" bigint NOT NULL,
    "quota_files" integer NOT NULL,
    "permissions" text NOT NULL,
    "used_quota_size" bigint NOT NULL,
    "used_quota_files" integer NOT NULL,
    "last_quota_update" bigint NOT NULL,
    "upload_bandwidth" integer NOT NULL,
    "download_bandwidth" integer NOT NULL,
    "expiration_date" bigint NOT NULL,
    "last_login" bigint NOT NULL,
    "status" integer NOT NULL,
    "filters" text NULL,
    "filesystem" text NULL
)"#,
    r#"INSERT INTO "new__{{users}}" ("id", "username", "password", "public_keys", "home_dir", "uid", "gid",
    "max_sessions", "quota_size", "quota_files", "permissions", "used_quota_size", "used_quota_files",
    "last_quota_update", "upload_bandwidth", "download_bandwidth", "expiration_date", "last_login",
    "status", "filters", "filesystem")
SELECT "id", "username", "password", "public_keys", "home_dir", "uid", "gid",
    "max_sessions", "quota_size", "quota_files", "permissions", "used_quota_size", "used_quota_files",
    "last_quota_update", "upload_bandwidth", "download_bandwidth", "expiration_date", "last_login",
    "status", "filters", "filesystem"
FROM "{{users}}""#,
    r#"DROP TABLE "{{users}}""#,
    r#"ALTER TABLE "new__{{users}}" RENAME TO "{{users}}""#,
    r#"CREATE TABLE "{{folders_mapping}}" (
    "id" integer NOT NULL PRIMARY KEY AUTOINCREMENT,
    "virtual_path" varchar(512) NOT NULL,
    "quota_size" bigint NOT NULL,
    "quota_files" integer NOT NULL,
    "folder_id" integer NOT NULL REFERENCES "{{folders}}" ("id") ON DELETE CASCADE,
    "user_id" integer NOT NULL REFERENCES "{{users}}" ("id") ON DELETE CASCADE,
    CONSTRAINT "unique_mapping" UNIQUE ("user_id", "folder_id")
)"#,
    r#"CREATE INDEX "folders_mapping_folder_id_idx" ON "{{folders_mapping}}" ("folder_id")"#,
    r#"CREATE INDEX "folders_mapping_user_id_idx" ON "{{folders_mapping}}" ("user_id")"#,
];

// ========================================
// Version 4 → 5: normalize legacy user rows
// ========================================

const UPGRADE_4_TO_5_SQL: &[&str] = &[
    r#"UPDATE "{{users}}" SET "filesystem" = '{"provider":0}' WHERE "filesystem" IS NULL"#,
    r#"UPDATE "{{users}}" SET "filters" = '{}' WHERE "filters" IS NULL"#,
];

const MIGRATIONS: &[Migration] = &[
    Migration::new(1, UPGRADE_1_TO_2_SQL),
    Migration::new(2, UPGRADE_2_TO_3_SQL),
    Migration::new(3, UPGRADE_3_TO_4_SQL),
    Migration::new(4, UPGRADE_4_TO_5_SQL),
];

pub(super) static SCRIPTS: SchemaScripts = SchemaScripts {
    dialect: Dialect::Sqlite,
    table_exists: r#"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '{{schema_version}}'"#,
    base: &[CREATE_USERS_SQL, CREATE_SCHEMA_VERSION_SQL],
    read_version: r#"SELECT COUNT(*), MAX("version") FROM "{{schema_version}}""#,
    seed_version: r#"INSERT INTO "{{schema_version}}" ("version") VALUES (1)"#,
    update_version: r#"UPDATE "{{schema_version}}" SET "version" = {{version}}"#,
    migrations: MIGRATIONS,
};
