// ==========================================
// 计费主数据导入系统 - 导入规格目录
// ==========================================
// 职责: 每个实体族一份静态 ImportSpec（表头顺序即校验顺序）
// 约束: 列名同时作为 SQL 标识符使用,只能来自本目录的静态常量
// ==========================================

use crate::domain::import_spec::{
    BatchRule, ColumnKind, ColumnSpec, EnumTable, ImportSpec, KeyMode, KeySpace,
};
use crate::domain::types::EntityKind;

const TEXT: ColumnKind = ColumnKind::Text;
const INTEGER: ColumnKind = ColumnKind::Integer;
const DECIMAL: ColumnKind = ColumnKind::Decimal;
const DATE: ColumnKind = ColumnKind::Date;
const BOOLEAN: ColumnKind = ColumnKind::Boolean;

const fn fk(space: KeySpace) -> ColumnKind {
    ColumnKind::ForeignKey(space)
}

// ==========================================
// 枚举编码表
// ==========================================
pub static TAX_CATEGORY: EnumTable = EnumTable {
    name: "tax_category",
    entries: &[(1, "TAX_CATEGORY_INCLUSIVE"), (2, "TAX_CATEGORY_EXCLUSIVE")],
};

pub static DISCOUNT_TYPE: EnumTable = EnumTable {
    name: "discount_type",
    entries: &[
        (1, "DISCOUNT_TYPE_REGULAR"),
        (2, "DISCOUNT_TYPE_COMBO"),
        (3, "DISCOUNT_TYPE_SIBLING"),
        (4, "DISCOUNT_TYPE_EMPLOYEE_FULL_TIME"),
        (5, "DISCOUNT_TYPE_EMPLOYEE_PART_TIME"),
        (6, "DISCOUNT_TYPE_FAMILY"),
        (7, "DISCOUNT_TYPE_SINGLE_PARENT"),
    ],
};

pub static DISCOUNT_AMOUNT_TYPE: EnumTable = EnumTable {
    name: "discount_amount_type",
    entries: &[
        (1, "DISCOUNT_AMOUNT_TYPE_PERCENTAGE"),
        (2, "DISCOUNT_AMOUNT_TYPE_FIXED_AMOUNT"),
    ],
};

pub static FEE_TYPE: EnumTable = EnumTable {
    name: "fee_type",
    entries: &[(1, "FEE_TYPE_ONE_TIME"), (2, "FEE_TYPE_RECURRING")],
};

pub static MATERIAL_TYPE: EnumTable = EnumTable {
    name: "material_type",
    entries: &[(1, "MATERIAL_TYPE_ONE_TIME"), (2, "MATERIAL_TYPE_RECURRING")],
};

pub static PACKAGE_TYPE: EnumTable = EnumTable {
    name: "package_type",
    entries: &[
        (1, "PACKAGE_TYPE_ONE_TIME"),
        (2, "PACKAGE_TYPE_SLOT_BASED"),
        (3, "PACKAGE_TYPE_FREQUENCY"),
        (4, "PACKAGE_TYPE_SCHEDULED"),
    ],
};

const AVAILABILITY_WINDOW: BatchRule = BatchRule::NotAfter {
    earlier: "available_from",
    later: "available_until",
};

const PERIOD_WINDOW: BatchRule = BatchRule::NotAfter {
    earlier: "start_date",
    later: "end_date",
};

// ==========================================
// 参考表（ById）
// ==========================================
pub static TAX: ImportSpec = ImportSpec {
    entity: EntityKind::Tax,
    table: "tax",
    columns: &[
        ColumnSpec::optional("tax_id", TEXT),
        ColumnSpec::required("name", TEXT),
        ColumnSpec::required("tax_percentage", DECIMAL),
        ColumnSpec::required("tax_category", ColumnKind::Enum(&TAX_CATEGORY)),
        ColumnSpec::required("default_flag", BOOLEAN),
        ColumnSpec::required("is_archived", BOOLEAN),
    ],
    key_mode: KeyMode::ById {
        id_column: "tax_id",
        key_space: KeySpace::Tax,
    },
    rules: &[BatchRule::SingleTrueInBatch("default_flag")],
};

pub static DISCOUNT: ImportSpec = ImportSpec {
    entity: EntityKind::Discount,
    table: "discount",
    columns: &[
        ColumnSpec::optional("discount_id", TEXT),
        ColumnSpec::required("name", TEXT),
        ColumnSpec::required("discount_type", ColumnKind::Enum(&DISCOUNT_TYPE)),
        ColumnSpec::required("discount_amount_type", ColumnKind::Enum(&DISCOUNT_AMOUNT_TYPE)),
        ColumnSpec::required("discount_amount_value", DECIMAL),
        ColumnSpec::optional("recurring_valid_duration", INTEGER),
        ColumnSpec::required("available_from", DATE),
        ColumnSpec::required("available_until", DATE),
        ColumnSpec::optional("remarks", TEXT),
        ColumnSpec::required("is_archived", BOOLEAN),
        // 标签 ID 由标签服务维护,此处只原样保存
        ColumnSpec::optional("student_tag_id_validation", TEXT),
        ColumnSpec::optional("parent_tag_id_validation", TEXT),
        ColumnSpec::optional("discount_tag_id", TEXT),
    ],
    key_mode: KeyMode::ById {
        id_column: "discount_id",
        key_space: KeySpace::Discount,
    },
    rules: &[AVAILABILITY_WINDOW],
};

pub static BILLING_SCHEDULE: ImportSpec = ImportSpec {
    entity: EntityKind::BillingSchedule,
    table: "billing_schedule",
    columns: &[
        ColumnSpec::optional("billing_schedule_id", TEXT),
        ColumnSpec::required("name", TEXT),
        ColumnSpec::optional("remarks", TEXT),
        ColumnSpec::required("is_archived", BOOLEAN),
    ],
    key_mode: KeyMode::ById {
        id_column: "billing_schedule_id",
        key_space: KeySpace::BillingSchedule,
    },
    rules: &[],
};

pub static BILLING_SCHEDULE_PERIOD: ImportSpec = ImportSpec {
    entity: EntityKind::BillingSchedulePeriod,
    table: "billing_schedule_period",
    columns: &[
        ColumnSpec::optional("billing_schedule_period_id", TEXT),
        ColumnSpec::required("name", TEXT),
        ColumnSpec::required("billing_schedule_id", fk(KeySpace::BillingSchedule)),
        ColumnSpec::required("start_date", DATE),
        ColumnSpec::required("end_date", DATE),
        ColumnSpec::required("billing_date", DATE),
        ColumnSpec::optional("remarks", TEXT),
        ColumnSpec::required("is_archived", BOOLEAN),
    ],
    key_mode: KeyMode::ById {
        id_column: "billing_schedule_period_id",
        key_space: KeySpace::BillingSchedulePeriod,
    },
    rules: &[PERIOD_WINDOW],
};

pub static BILLING_RATIO: ImportSpec = ImportSpec {
    entity: EntityKind::BillingRatio,
    table: "billing_ratio",
    columns: &[
        ColumnSpec::optional("billing_ratio_id", TEXT),
        ColumnSpec::required("start_date", DATE),
        ColumnSpec::required("end_date", DATE),
        ColumnSpec::required(
            "billing_schedule_period_id",
            fk(KeySpace::BillingSchedulePeriod),
        ),
        ColumnSpec::required("billing_ratio_numerator", INTEGER),
        ColumnSpec::required("billing_ratio_denominator", INTEGER),
        ColumnSpec::required("is_archived", BOOLEAN),
    ],
    key_mode: KeyMode::ById {
        id_column: "billing_ratio_id",
        key_space: KeySpace::BillingRatio,
    },
    rules: &[PERIOD_WINDOW],
};

pub static ACCOUNTING_CATEGORY: ImportSpec = ImportSpec {
    entity: EntityKind::AccountingCategory,
    table: "accounting_category",
    columns: &[
        ColumnSpec::optional("accounting_category_id", TEXT),
        ColumnSpec::required("name", TEXT),
        ColumnSpec::optional("remarks", TEXT),
        ColumnSpec::required("is_archived", BOOLEAN),
    ],
    key_mode: KeyMode::ById {
        id_column: "accounting_category_id",
        key_space: KeySpace::AccountingCategory,
    },
    rules: &[],
};

pub static FEE: ImportSpec = ImportSpec {
    entity: EntityKind::Fee,
    table: "fee",
    columns: &[
        ColumnSpec::optional("fee_id", TEXT),
        ColumnSpec::required("name", TEXT),
        ColumnSpec::required("fee_type", ColumnKind::Enum(&FEE_TYPE)),
        ColumnSpec::optional("tax_id", fk(KeySpace::Tax)),
        ColumnSpec::optional("product_tag", TEXT),
        ColumnSpec::optional("product_partner_id", TEXT),
        ColumnSpec::required("available_from", DATE),
        ColumnSpec::required("available_until", DATE),
        ColumnSpec::optional("custom_billing_period", DATE),
        ColumnSpec::optional("billing_schedule_id", fk(KeySpace::BillingSchedule)),
        ColumnSpec::optional("disable_pro_rating_flag", BOOLEAN),
        ColumnSpec::optional("remarks", TEXT),
        ColumnSpec::optional("is_archived", BOOLEAN),
        ColumnSpec::optional("is_unique", BOOLEAN),
    ],
    key_mode: KeyMode::ById {
        id_column: "fee_id",
        key_space: KeySpace::Fee,
    },
    rules: &[AVAILABILITY_WINDOW],
};

pub static MATERIAL: ImportSpec = ImportSpec {
    entity: EntityKind::Material,
    table: "material",
    columns: &[
        ColumnSpec::optional("material_id", TEXT),
        ColumnSpec::required("name", TEXT),
        ColumnSpec::required("material_type", ColumnKind::Enum(&MATERIAL_TYPE)),
        ColumnSpec::optional("tax_id", fk(KeySpace::Tax)),
        ColumnSpec::optional("product_tag", TEXT),
        ColumnSpec::optional("product_partner_id", TEXT),
        ColumnSpec::required("available_from", DATE),
        ColumnSpec::required("available_until", DATE),
        ColumnSpec::optional("custom_billing_period", DATE),
        ColumnSpec::optional("custom_billing_date", DATE),
        ColumnSpec::optional("billing_schedule_id", fk(KeySpace::BillingSchedule)),
        ColumnSpec::optional("disable_pro_rating_flag", BOOLEAN),
        ColumnSpec::optional("remarks", TEXT),
        ColumnSpec::optional("is_archived", BOOLEAN),
        ColumnSpec::optional("is_unique", BOOLEAN),
    ],
    key_mode: KeyMode::ById {
        id_column: "material_id",
        key_space: KeySpace::Material,
    },
    rules: &[AVAILABILITY_WINDOW],
};

pub static PACKAGE: ImportSpec = ImportSpec {
    entity: EntityKind::Package,
    table: "package",
    columns: &[
        ColumnSpec::optional("package_id", TEXT),
        ColumnSpec::required("name", TEXT),
        ColumnSpec::required("package_type", ColumnKind::Enum(&PACKAGE_TYPE)),
        ColumnSpec::optional("tax_id", fk(KeySpace::Tax)),
        ColumnSpec::optional("product_tag", TEXT),
        ColumnSpec::optional("product_partner_id", TEXT),
        ColumnSpec::required("available_from", DATE),
        ColumnSpec::required("available_until", DATE),
        ColumnSpec::required("max_slot", INTEGER),
        ColumnSpec::optional("custom_billing_period", DATE),
        ColumnSpec::optional("billing_schedule_id", fk(KeySpace::BillingSchedule)),
        ColumnSpec::optional("disable_pro_rating_flag", BOOLEAN),
        ColumnSpec::optional("package_start_date", DATE),
        ColumnSpec::optional("package_end_date", DATE),
        ColumnSpec::optional("remarks", TEXT),
        ColumnSpec::optional("is_archived", BOOLEAN),
        ColumnSpec::optional("is_unique", BOOLEAN),
    ],
    key_mode: KeyMode::ById {
        id_column: "package_id",
        key_space: KeySpace::Package,
    },
    rules: &[
        AVAILABILITY_WINDOW,
        BatchRule::NotAfter {
            earlier: "package_start_date",
            later: "package_end_date",
        },
    ],
};

// ==========================================
// 关联表（ByNaturalKey）
// ==========================================
pub static PRODUCT_PRICE: ImportSpec = ImportSpec {
    entity: EntityKind::ProductPrice,
    table: "product_price",
    columns: &[
        ColumnSpec::required("product_id", fk(KeySpace::Product)),
        ColumnSpec::optional(
            "billing_schedule_period_id",
            fk(KeySpace::BillingSchedulePeriod),
        ),
        ColumnSpec::optional("quantity", INTEGER),
        ColumnSpec::required("price", DECIMAL),
    ],
    key_mode: KeyMode::ByNaturalKey(&["product_id", "billing_schedule_period_id", "quantity"]),
    rules: &[],
};

pub static PRODUCT_LOCATION: ImportSpec = ImportSpec {
    entity: EntityKind::ProductLocation,
    table: "product_location",
    columns: &[
        ColumnSpec::required("product_id", fk(KeySpace::Product)),
        ColumnSpec::required("location_id", fk(KeySpace::Location)),
    ],
    key_mode: KeyMode::ByNaturalKey(&["product_id", "location_id"]),
    rules: &[],
};

pub static PRODUCT_GRADE: ImportSpec = ImportSpec {
    entity: EntityKind::ProductGrade,
    table: "product_grade",
    columns: &[
        ColumnSpec::required("product_id", fk(KeySpace::Product)),
        ColumnSpec::required("grade_id", fk(KeySpace::Grade)),
    ],
    key_mode: KeyMode::ByNaturalKey(&["product_id", "grade_id"]),
    rules: &[],
};

pub static PRODUCT_ACCOUNTING_CATEGORY: ImportSpec = ImportSpec {
    entity: EntityKind::ProductAccountingCategory,
    table: "product_accounting_category",
    columns: &[
        ColumnSpec::required("product_id", fk(KeySpace::Product)),
        ColumnSpec::required("accounting_category_id", fk(KeySpace::AccountingCategory)),
    ],
    key_mode: KeyMode::ByNaturalKey(&["product_id", "accounting_category_id"]),
    rules: &[],
};

pub static PRODUCT_DISCOUNT: ImportSpec = ImportSpec {
    entity: EntityKind::ProductDiscount,
    table: "product_discount",
    columns: &[
        ColumnSpec::required("product_id", fk(KeySpace::Product)),
        ColumnSpec::required("discount_id", fk(KeySpace::Discount)),
    ],
    key_mode: KeyMode::ByNaturalKey(&["product_id", "discount_id"]),
    rules: &[],
};

pub static PACKAGE_COURSE: ImportSpec = ImportSpec {
    entity: EntityKind::PackageCourse,
    table: "package_course",
    columns: &[
        ColumnSpec::required("package_id", fk(KeySpace::Package)),
        ColumnSpec::required("course_id", fk(KeySpace::Course)),
        ColumnSpec::required("mandatory_flag", BOOLEAN),
        ColumnSpec::required("max_slots_per_course", INTEGER),
        ColumnSpec::required("course_weight", INTEGER),
    ],
    key_mode: KeyMode::ByNaturalKey(&["package_id", "course_id"]),
    rules: &[],
};

pub static PACKAGE_COURSE_FEE: ImportSpec = ImportSpec {
    entity: EntityKind::PackageCourseFee,
    table: "package_course_fee",
    columns: &[
        ColumnSpec::required("package_id", fk(KeySpace::Package)),
        ColumnSpec::required("course_id", fk(KeySpace::Course)),
        ColumnSpec::required("fee_id", fk(KeySpace::Fee)),
        ColumnSpec::required("available_from", DATE),
        ColumnSpec::required("available_until", DATE),
        ColumnSpec::required("is_added_by_default", BOOLEAN),
    ],
    key_mode: KeyMode::ByNaturalKey(&["package_id", "course_id", "fee_id"]),
    rules: &[AVAILABILITY_WINDOW],
};

pub static PACKAGE_COURSE_MATERIAL: ImportSpec = ImportSpec {
    entity: EntityKind::PackageCourseMaterial,
    table: "package_course_material",
    columns: &[
        ColumnSpec::required("package_id", fk(KeySpace::Package)),
        ColumnSpec::required("course_id", fk(KeySpace::Course)),
        ColumnSpec::required("material_id", fk(KeySpace::Material)),
        ColumnSpec::required("available_from", DATE),
        ColumnSpec::required("available_until", DATE),
        ColumnSpec::required("is_added_by_default", BOOLEAN),
    ],
    key_mode: KeyMode::ByNaturalKey(&["package_id", "course_id", "material_id"]),
    rules: &[AVAILABILITY_WINDOW],
};

/// 判别器 → 导入规格
pub fn spec_for(entity: EntityKind) -> &'static ImportSpec {
    match entity {
        EntityKind::Tax => &TAX,
        EntityKind::Discount => &DISCOUNT,
        EntityKind::BillingSchedule => &BILLING_SCHEDULE,
        EntityKind::BillingSchedulePeriod => &BILLING_SCHEDULE_PERIOD,
        EntityKind::BillingRatio => &BILLING_RATIO,
        EntityKind::AccountingCategory => &ACCOUNTING_CATEGORY,
        EntityKind::Fee => &FEE,
        EntityKind::Material => &MATERIAL,
        EntityKind::Package => &PACKAGE,
        EntityKind::ProductPrice => &PRODUCT_PRICE,
        EntityKind::ProductLocation => &PRODUCT_LOCATION,
        EntityKind::ProductGrade => &PRODUCT_GRADE,
        EntityKind::ProductAccountingCategory => &PRODUCT_ACCOUNTING_CATEGORY,
        EntityKind::ProductDiscount => &PRODUCT_DISCOUNT,
        EntityKind::PackageCourse => &PACKAGE_COURSE,
        EntityKind::PackageCourseFee => &PACKAGE_COURSE_FEE,
        EntityKind::PackageCourseMaterial => &PACKAGE_COURSE_MATERIAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_entity_has_matching_spec() {
        for kind in EntityKind::ALL {
            let spec = spec_for(kind);
            assert_eq!(spec.entity, kind);
            assert_eq!(spec.table, kind.as_str());
        }
    }

    #[test]
    fn test_column_names_unique_per_spec() {
        for kind in EntityKind::ALL {
            let spec = spec_for(kind);
            let names: HashSet<_> = spec.columns.iter().map(|c| c.name).collect();
            assert_eq!(names.len(), spec.columns.len(), "{} 列名重复", kind);
        }
    }

    #[test]
    fn test_key_and_rule_columns_exist() {
        for kind in EntityKind::ALL {
            let spec = spec_for(kind);
            for key in spec.key_columns() {
                assert!(spec.position(key).is_some(), "{} 缺少键列 {}", kind, key);
            }
            for rule in spec.rules {
                let names = match rule {
                    BatchRule::SingleTrueInBatch(column) => vec![*column],
                    BatchRule::NotAfter { earlier, later } => vec![*earlier, *later],
                };
                for name in names {
                    assert!(spec.position(name).is_some(), "{} 缺少规则列 {}", kind, name);
                }
            }
        }
    }

    #[test]
    fn test_tax_header_order() {
        assert_eq!(
            TAX.header(),
            vec![
                "tax_id",
                "name",
                "tax_percentage",
                "tax_category",
                "default_flag",
                "is_archived"
            ]
        );
    }
}
