use super::{Dialect, Migration, SchemaScripts};

const CREATE_USERS_SQL: &str = r#"CREATE TABLE [{{users}}] (
    [id] [int] IDENTITY(1,1) NOT NULL PRIMARY KEY,
    [username] [varchar](255) NOT NULL UNIQUE,
    [password] [varchar](255) NULL,
    [public_keys] [text] NULL,
    [home_dir] [varchar](255) NOT NULL,
    [uid] [int] NOT NULL,
    [gid] [int] NOT NULL,
    [max_sessions] [int] NOT NULL,
    [quota_size] [bigint] NOT NULL,
    [quota_files] [int] NOT NULL,
    [permissions] [text] NOT NULL,
    [used_quota_size] [bigint] NOT NULL,
    [used_quota_files] [int] NOT NULL,
    [last_quota_update] [bigint] NOT NULL,
    [upload_bandwidth] [int] NOT NULL,
    [download_bandwidth] [int] NOT NULL,
    [expiration_date] [bigint] NOT NULL,
    [last_login] [bigint] NOT NULL,
    [status] [int] NOT NULL,
    [filters] [text] NULL,
    [filesystem] [text] NULL
)"#;

const CREATE_SCHEMA_VERSION_SQL: &str =
    "CREATE TABLE [{{schema_version}}] ([id] [int] IDENTITY(1,1) NOT NULL PRIMARY KEY, [version] [int] NOT NULL)";

const UPGRADE_1_TO_2_SQL: &[&str] = &["ALTER TABLE [{{users}}] ADD [virtual_folders] [text] NULL"];

const UPGRADE_2_TO_3_SQL: &[&str] = &["ALTER TABLE [{{users}}] ALTER COLUMN [password] [text]"];

const UPGRADE_3_TO_4_SQL: &[&str] = &[
    r#"CREATE TABLE [{{folders}}] (
    [id] [int] IDENTITY(1,1) NOT NULL PRIMARY KEY,
    [path] [varchar](512) NOT NULL UNIQUE,
    [used_quota_size] [bigint] NOT NULL,
    [used_quota_files] [int] NOT NULL,
    [last_quota_update] [bigint] NOT NULL
)"#,
    "ALTER TABLE [{{users}}] ALTER COLUMN [home_dir] [varchar](512)",
    "ALTER TABLE [{{users}}] DROP COLUMN [virtual_folders]",
    r#"CREATE TABLE [{{folders_mapping}}] (
    [id] [int] IDENTITY(1,1) NOT NULL PRIMARY KEY,
    [virtual_path] [varchar](512) NOT NULL,
    [quota_size] [bigint] NOT NULL,
    [quota_files] [int] NOT NULL,
    [folder_id] [int] NOT NULL,
    [user_id] [int] NOT NULL
)"#,
    "ALTER TABLE [{{folders_mapping}}] ADD CONSTRAINT [unique_mapping] UNIQUE ([user_id], [folder_id])",
    "ALTER TABLE [{{folders_mapping}}] ADD CONSTRAINT [folders_mapping_folder_id_fk_folders_id] FOREIGN KEY ([folder_id]) REFERENCES [{{folders}}] ([id]) ON DELETE CASCADE ON UPDATE NO ACTION",
    "ALTER TABLE [{{folders_mapping}}] ADD CONSTRAINT [folders_mapping_user_id_fk_users_id] FOREIGN KEY ([user_id]) REFERENCES [{{users}}] ([id]) ON DELETE CASCADE ON UPDATE NO ACTION",
    "CREATE INDEX [folders_mapping_folder_id_idx] ON [{{folders_mapping}}] ([folder_id])",
    "CREATE INDEX [folders_mapping_user_id_idx] ON [{{folders_mapping}}] ([user_id])",
];

const UPGRADE_4_TO_5_SQL: &[&str] = &[
    r#"UPDATE [{{users}}] SET [filesystem] = '{"provider":0}' WHERE [filesystem] IS NULL"#,
    "UPDATE [{{users}}] SET [filters] = '{}' WHERE [filters] IS NULL",
];

const MIGRATIONS: &[Migration] = &[
    Migration::new(1, UPGRADE_1_TO_2_SQL),
    Migration::new(2, UPGRADE_2_TO_3_SQL),
    Migration::new(3, UPGRADE_3_TO_4_SQL),
    Migration::new(4, UPGRADE_4_TO_5_SQL),
];

pub(super) static SCRIPTS: SchemaScripts = SchemaScripts {
    dialect: Dialect::Mssql,
    table_exists: "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = '{{schema_version}}'",
    base: &[CREATE_USERS_SQL, CREATE_SCHEMA_VERSION_SQL],
    read_version: "SELECT COUNT(*), MAX([version]) FROM [{{schema_version}}]",
    seed_version: "INSERT INTO [{{schema_version}}] ([version]) VALUES (1)",
    update_version: "UPDATE [{{schema_version}}] SET [version] = {{version}}",
    migrations: MIGRATIONS,
};
