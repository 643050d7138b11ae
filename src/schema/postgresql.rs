use super::{Dialect, Migration, SchemaScripts};

const CREATE_USERS_SQL: &str = r#"CREATE TABLE "{{users}}" (
    "id" serial NOT NULL PRIMARY KEY,
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

const CREATE_SCHEMA_VERSION_SQL: &str =
    r#"CREATE TABLE "{{schema_version}}" ("id" serial NOT NULL PRIMARY KEY, "version" integer NOT NULL)"#;

const UPGRADE_1_TO_2_SQL: &[&str] = &[r#"ALTER TABLE "{{users}}" ADD COLUMN "virtual_folders" text NULL"#];

const UPGRADE_2_TO_3_SQL: &[&str] =
    &[r#"ALTER TABLE "{{users}}" ALTER COLUMN "password" TYPE text USING "password"::text"#];

const UPGRADE_3_TO_4_SQL: &[&str] = &[
    r#"CREATE TABLE "{{folders}}" (
    "id" serial NOT NULL PRIMARY KEY,
    "path" varchar(512) NOT NULL UNIQUE,
    "used_quota_size" bigint NOT NULL,
    "used_quota_files" integer NOT NULL,
    "last_quota_update" bigint NOT NULL
)"#,
    r#"ALTER TABLE "{{users}}" ALTER COLUMN "home_dir" TYPE varchar(512) USING "home_dir"::varchar(512)"#,
    r#"ALTER TABLE "{{users}}" DROP COLUMN "virtual_folders" CASCADE"#,
    r#"CREATE TABLE "{{folders_mapping}}" (
    "id" serial NOT NULL PRIMARY KEY,
    "virtual_path" varchar(512) NOT NULL,
    "quota_size" bigint NOT NULL,
    "quota_files" integer NOT NULL,
    "folder_id" integer NOT NULL,
    "user_id" integer NOT NULL
)"#,
    r#"ALTER TABLE "{{folders_mapping}}" ADD CONSTRAINT "unique_mapping" UNIQUE ("user_id", "folder_id")"#,
    r#"ALTER TABLE "{{folders_mapping}}" ADD CONSTRAINT "folders_mapping_folder_id_fk_folders_id" FOREIGN KEY ("folder_id") REFERENCES "{{folders}}" ("id") MATCH SIMPLE ON UPDATE NO ACTION ON DELETE CASCADE"#,
    r#"ALTER TABLE "{{folders_mapping}}" ADD CONSTRAINT "folders_mapping_user_id_fk_users_id" FOREIGN KEY ("user_id") REFERENCES "{{users}}" ("id") MATCH SIMPLE ON UPDATE NO ACTION ON DELETE CASCADE"#,
    r#"CREATE INDEX "folders_mapping_folder_id_idx" ON "{{folders_mapping}}" ("folder_id")"#,
    r#"CREATE INDEX "folders_mapping_user_id_idx" ON "{{folders_mapping}}" ("user_id")"#,
];

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
    dialect: Dialect::Postgresql,
    table_exists: "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = '{{schema_version}}'",
    base: &[CREATE_USERS_SQL, CREATE_SCHEMA_VERSION_SQL],
    read_version: r#"SELECT COUNT(*), MAX("version") FROM "{{schema_version}}""#,
    seed_version: r#"INSERT INTO "{{schema_version}}" ("version") VALUES (1)"#,
    update_version: r#"UPDATE "{{schema_version}}" SET "version" = {{version}}"#,
    migrations: MIGRATIONS,
};
