// ==========================================
// 计费主数据导入系统 - 导入规格模型
// ==========================================
// 职责: 声明式描述每个实体族的表头、列校验、键模式与批内规则
// 约束: 规格为 'static 配置,进程生命周期内不可变
// ==========================================

use crate::domain::types::EntityKind;
use std::collections::{HashMap, HashSet};
use std::fmt;

// ==========================================
// EnumTable - 数字编码 → 命名常量
// ==========================================
#[derive(Debug)]
pub struct EnumTable {
    pub name: &'static str,
    pub entries: &'static [(i32, &'static str)],
}

impl EnumTable {
    /// 按数字编码查找常量名
    pub fn lookup(&self, code: i32) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
    }
}

// ==========================================
// KeySpace - 被引用实体的键空间
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySpace {
    Tax,
    Discount,
    BillingSchedule,
    BillingSchedulePeriod,
    BillingRatio,
    AccountingCategory,
    Fee,
    Material,
    Package,
    /// fee ∪ material ∪ package
    Product,
    Location,
    Grade,
    Course,
}

impl KeySpace {
    /// 拉取整个键集合的查询（每次导入每个键空间只执行一次）
    pub fn key_query(&self) -> &'static str {
        match self {
            KeySpace::Tax => "SELECT tax_id FROM tax",
            KeySpace::Discount => "SELECT discount_id FROM discount",
            KeySpace::BillingSchedule => "SELECT billing_schedule_id FROM billing_schedule",
            KeySpace::BillingSchedulePeriod => {
                "SELECT billing_schedule_period_id FROM billing_schedule_period"
            }
            KeySpace::BillingRatio => "SELECT billing_ratio_id FROM billing_ratio",
            KeySpace::AccountingCategory => {
                "SELECT accounting_category_id FROM accounting_category"
            }
            KeySpace::Fee => "SELECT fee_id FROM fee",
            KeySpace::Material => "SELECT material_id FROM material",
            KeySpace::Package => "SELECT package_id FROM package",
            KeySpace::Product => {
                "SELECT fee_id FROM fee \
                 UNION SELECT material_id FROM material \
                 UNION SELECT package_id FROM package"
            }
            KeySpace::Location => "SELECT location_id FROM location",
            KeySpace::Grade => "SELECT CAST(grade_id AS TEXT) FROM grade",
            KeySpace::Course => "SELECT course_id FROM course",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            KeySpace::Tax => "tax",
            KeySpace::Discount => "discount",
            KeySpace::BillingSchedule => "billing_schedule",
            KeySpace::BillingSchedulePeriod => "billing_schedule_period",
            KeySpace::BillingRatio => "billing_ratio",
            KeySpace::AccountingCategory => "accounting_category",
            KeySpace::Fee => "fee",
            KeySpace::Material => "material",
            KeySpace::Package => "package",
            KeySpace::Product => "product",
            KeySpace::Location => "location",
            KeySpace::Grade => "grade",
            KeySpace::Course => "course",
        }
    }
}

/// 本次导入加载的键集合（每个键空间一份）
pub type ReferenceKeys = HashMap<KeySpace, HashSet<String>>;

impl fmt::Display for KeySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ==========================================
// ColumnKind - 列类型
// ==========================================
#[derive(Debug, Clone, Copy)]
pub enum ColumnKind {
    Text,
    Integer,
    Decimal,
    Date,
    Boolean,
    Enum(&'static EnumTable),
    ForeignKey(KeySpace),
}

// ==========================================
// ColumnSpec - 单列规格
// ==========================================
// name 同时是表头名与存储列名
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            required: true,
            kind,
        }
    }

    pub const fn optional(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            required: false,
            kind,
        }
    }
}

// ==========================================
// KeyMode - 提交策略
// ==========================================
#[derive(Debug, Clone, Copy)]
pub enum KeyMode {
    /// 空 ID → 生成代理键新建;有 ID → 必须已存在,原地更新
    ById {
        id_column: &'static str,
        key_space: KeySpace,
    },
    /// 按自然键元组覆盖或新建
    ByNaturalKey(&'static [&'static str]),
}

// ==========================================
// BatchRule - 跨行/跨字段业务规则
// ==========================================
#[derive(Debug, Clone, Copy)]
pub enum BatchRule {
    /// 同一批次内至多一行可将该布尔列置为 true
    SingleTrueInBatch(&'static str),
    /// 两个日期列都有值时,前者不得晚于后者
    NotAfter {
        earlier: &'static str,
        later: &'static str,
    },
}

// ==========================================
// ImportSpec - 实体族导入规格
// ==========================================
#[derive(Debug)]
pub struct ImportSpec {
    pub entity: EntityKind,
    pub table: &'static str,
    pub columns: &'static [ColumnSpec],
    pub key_mode: KeyMode,
    pub rules: &'static [BatchRule],
}

impl ImportSpec {
    /// 期望的表头（顺序即列顺序）
    pub fn header(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// 本次导入需要加载的全部键空间（去重,保持声明顺序）
    pub fn key_spaces(&self) -> Vec<KeySpace> {
        let mut spaces = Vec::new();
        if let KeyMode::ById { key_space, .. } = self.key_mode {
            spaces.push(key_space);
        }
        for column in self.columns {
            if let ColumnKind::ForeignKey(space) = column.kind {
                if !spaces.contains(&space) {
                    spaces.push(space);
                }
            }
        }
        spaces
    }

    /// 键列名集合（ById: ID 列;ByNaturalKey: 自然键列）
    pub fn key_columns(&self) -> Vec<&'static str> {
        match self.key_mode {
            KeyMode::ById { id_column, .. } => vec![id_column],
            KeyMode::ByNaturalKey(columns) => columns.to_vec(),
        }
    }

    /// 非键属性列（提交时被覆盖的列）
    pub fn attribute_columns(&self) -> Vec<&'static str> {
        let keys = self.key_columns();
        self.columns
            .iter()
            .map(|c| c.name)
            .filter(|name| !keys.contains(name))
            .collect()
    }
}
