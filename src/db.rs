// ==========================================
// 计费主数据导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 幂等建表,记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表语句
///
/// 约定:
/// - 定点小数以 TEXT 存储（已定标）
/// - 时间戳由 rusqlite/chrono 以文本存储（UTC）
/// - 关联表以自然键唯一约束兜底
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER NOT NULL,
    applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id    TEXT NOT NULL,
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    PRIMARY KEY (scope_id, key)
);

-- ===== 外部维护的参考表（只读） =====

CREATE TABLE IF NOT EXISTS location (
    location_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS grade (
    grade_id    INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS course (
    course_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ===== 参考表（ById 导入） =====

CREATE TABLE IF NOT EXISTS tax (
    tax_id          TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    tax_percentage  TEXT NOT NULL,
    tax_category    TEXT NOT NULL,
    default_flag    INTEGER NOT NULL,
    is_archived     INTEGER NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS discount (
    discount_id                 TEXT PRIMARY KEY,
    name                        TEXT NOT NULL,
    discount_type               TEXT NOT NULL,
    discount_amount_type        TEXT NOT NULL,
    discount_amount_value       TEXT NOT NULL,
    recurring_valid_duration    INTEGER,
    available_from              TEXT NOT NULL,
    available_until             TEXT NOT NULL,
    remarks                     TEXT,
    is_archived                 INTEGER NOT NULL,
    student_tag_id_validation   TEXT,
    parent_tag_id_validation    TEXT,
    discount_tag_id             TEXT,
    created_at                  TEXT NOT NULL,
    updated_at                  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS billing_schedule (
    billing_schedule_id TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    remarks             TEXT,
    is_archived         INTEGER NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS billing_schedule_period (
    billing_schedule_period_id  TEXT PRIMARY KEY,
    name                        TEXT NOT NULL,
    billing_schedule_id         TEXT NOT NULL REFERENCES billing_schedule(billing_schedule_id),
    start_date                  TEXT NOT NULL,
    end_date                    TEXT NOT NULL,
    billing_date                TEXT NOT NULL,
    remarks                     TEXT,
    is_archived                 INTEGER NOT NULL,
    created_at                  TEXT NOT NULL,
    updated_at                  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS billing_ratio (
    billing_ratio_id            TEXT PRIMARY KEY,
    start_date                  TEXT NOT NULL,
    end_date                    TEXT NOT NULL,
    billing_schedule_period_id  TEXT NOT NULL
        REFERENCES billing_schedule_period(billing_schedule_period_id),
    billing_ratio_numerator     INTEGER NOT NULL,
    billing_ratio_denominator   INTEGER NOT NULL,
    is_archived                 INTEGER NOT NULL,
    created_at                  TEXT NOT NULL,
    updated_at                  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounting_category (
    accounting_category_id  TEXT PRIMARY KEY,
    name                    TEXT NOT NULL,
    remarks                 TEXT,
    is_archived             INTEGER NOT NULL,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fee (
    fee_id                  TEXT PRIMARY KEY,
    name                    TEXT NOT NULL,
    fee_type                TEXT NOT NULL,
    tax_id                  TEXT REFERENCES tax(tax_id),
    product_tag             TEXT,
    product_partner_id      TEXT,
    available_from          TEXT NOT NULL,
    available_until         TEXT NOT NULL,
    custom_billing_period   TEXT,
    billing_schedule_id     TEXT REFERENCES billing_schedule(billing_schedule_id),
    disable_pro_rating_flag INTEGER,
    remarks                 TEXT,
    is_archived             INTEGER,
    is_unique               INTEGER,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS material (
    material_id             TEXT PRIMARY KEY,
    name                    TEXT NOT NULL,
    material_type           TEXT NOT NULL,
    tax_id                  TEXT REFERENCES tax(tax_id),
    product_tag             TEXT,
    product_partner_id      TEXT,
    available_from          TEXT NOT NULL,
    available_until         TEXT NOT NULL,
    custom_billing_period   TEXT,
    custom_billing_date     TEXT,
    billing_schedule_id     TEXT REFERENCES billing_schedule(billing_schedule_id),
    disable_pro_rating_flag INTEGER,
    remarks                 TEXT,
    is_archived             INTEGER,
    is_unique               INTEGER,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS package (
    package_id              TEXT PRIMARY KEY,
    name                    TEXT NOT NULL,
    package_type            TEXT NOT NULL,
    tax_id                  TEXT REFERENCES tax(tax_id),
    product_tag             TEXT,
    product_partner_id      TEXT,
    available_from          TEXT NOT NULL,
    available_until         TEXT NOT NULL,
    max_slot                INTEGER NOT NULL,
    custom_billing_period   TEXT,
    billing_schedule_id     TEXT REFERENCES billing_schedule(billing_schedule_id),
    disable_pro_rating_flag INTEGER,
    package_start_date      TEXT,
    package_end_date        TEXT,
    remarks                 TEXT,
    is_archived             INTEGER,
    is_unique               INTEGER,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

-- ===== 关联表（ByNaturalKey 导入） =====
-- product_id 指向 fee ∪ material ∪ package,无法声明外键,由导入校验保证

CREATE TABLE IF NOT EXISTS product_price (
    product_id                  TEXT NOT NULL,
    billing_schedule_period_id  TEXT
        REFERENCES billing_schedule_period(billing_schedule_period_id),
    quantity                    INTEGER,
    price                       TEXT NOT NULL,
    created_at                  TEXT NOT NULL,
    updated_at                  TEXT NOT NULL,
    UNIQUE (product_id, billing_schedule_period_id, quantity)
);

CREATE TABLE IF NOT EXISTS product_location (
    product_id  TEXT NOT NULL,
    location_id TEXT NOT NULL REFERENCES location(location_id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (product_id, location_id)
);

CREATE TABLE IF NOT EXISTS product_grade (
    product_id  TEXT NOT NULL,
    grade_id    INTEGER NOT NULL REFERENCES grade(grade_id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (product_id, grade_id)
);

CREATE TABLE IF NOT EXISTS product_accounting_category (
    product_id              TEXT NOT NULL,
    accounting_category_id  TEXT NOT NULL
        REFERENCES accounting_category(accounting_category_id),
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL,
    UNIQUE (product_id, accounting_category_id)
);

CREATE TABLE IF NOT EXISTS product_discount (
    product_id  TEXT NOT NULL,
    discount_id TEXT NOT NULL REFERENCES discount(discount_id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (product_id, discount_id)
);

CREATE TABLE IF NOT EXISTS package_course (
    package_id              TEXT NOT NULL REFERENCES package(package_id),
    course_id               TEXT NOT NULL REFERENCES course(course_id),
    mandatory_flag          INTEGER NOT NULL,
    max_slots_per_course    INTEGER NOT NULL,
    course_weight           INTEGER NOT NULL,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL,
    UNIQUE (package_id, course_id)
);

CREATE TABLE IF NOT EXISTS package_course_fee (
    package_id          TEXT NOT NULL REFERENCES package(package_id),
    course_id           TEXT NOT NULL REFERENCES course(course_id),
    fee_id              TEXT NOT NULL REFERENCES fee(fee_id),
    available_from      TEXT NOT NULL,
    available_until     TEXT NOT NULL,
    is_added_by_default INTEGER NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    UNIQUE (package_id, course_id, fee_id)
);

CREATE TABLE IF NOT EXISTS package_course_material (
    package_id          TEXT NOT NULL REFERENCES package(package_id),
    course_id           TEXT NOT NULL REFERENCES course(course_id),
    material_id         TEXT NOT NULL REFERENCES material(material_id),
    available_from      TEXT NOT NULL,
    available_until     TEXT NOT NULL,
    is_added_by_default INTEGER NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    UNIQUE (package_id, course_id, material_id)
);
"#;

/// 幂等建表并记录 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    if read_schema_version(conn)?.unwrap_or(0) < CURRENT_SCHEMA_VERSION {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
