// ==========================================
// 计费主数据导入系统 - 领域类型定义
// ==========================================
// 职责: 导入实体族（判别器）与各类子类型枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入实体族 (Entity Kind)
// ==========================================
// 每个取值对应一份 ImportSpec,也是请求的判别器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    // ===== 参考表（按 ID 新建/更新）=====
    Tax,
    Discount,
    BillingSchedule,
    BillingSchedulePeriod,
    BillingRatio,
    AccountingCategory,
    Fee,
    Material,
    Package,

    // ===== 关联表（按自然键覆盖）=====
    ProductPrice,
    ProductLocation,
    ProductGrade,
    ProductAccountingCategory,
    ProductDiscount,
    PackageCourse,
    PackageCourseFee,
    PackageCourseMaterial,
}

impl EntityKind {
    pub const ALL: [EntityKind; 17] = [
        EntityKind::Tax,
        EntityKind::Discount,
        EntityKind::BillingSchedule,
        EntityKind::BillingSchedulePeriod,
        EntityKind::BillingRatio,
        EntityKind::AccountingCategory,
        EntityKind::Fee,
        EntityKind::Material,
        EntityKind::Package,
        EntityKind::ProductPrice,
        EntityKind::ProductLocation,
        EntityKind::ProductGrade,
        EntityKind::ProductAccountingCategory,
        EntityKind::ProductDiscount,
        EntityKind::PackageCourse,
        EntityKind::PackageCourseFee,
        EntityKind::PackageCourseMaterial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Tax => "tax",
            EntityKind::Discount => "discount",
            EntityKind::BillingSchedule => "billing_schedule",
            EntityKind::BillingSchedulePeriod => "billing_schedule_period",
            EntityKind::BillingRatio => "billing_ratio",
            EntityKind::AccountingCategory => "accounting_category",
            EntityKind::Fee => "fee",
            EntityKind::Material => "material",
            EntityKind::Package => "package",
            EntityKind::ProductPrice => "product_price",
            EntityKind::ProductLocation => "product_location",
            EntityKind::ProductGrade => "product_grade",
            EntityKind::ProductAccountingCategory => "product_accounting_category",
            EntityKind::ProductDiscount => "product_discount",
            EntityKind::PackageCourse => "package_course",
            EntityKind::PackageCourseFee => "package_course_fee",
            EntityKind::PackageCourseMaterial => "package_course_material",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("未知的导入实体: {}", s))
    }
}

// ==========================================
// 产品类型 (Product Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Fee,
    Material,
    Package,
}

impl From<ProductType> for EntityKind {
    fn from(value: ProductType) -> Self {
        match value {
            ProductType::Fee => EntityKind::Fee,
            ProductType::Material => EntityKind::Material,
            ProductType::Package => EntityKind::Package,
        }
    }
}

// ==========================================
// 产品关联数据类型 (Associated Data Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssociatedDataType {
    Location,
    Grade,
    AccountingCategory,
    Discount,
    Course,
}

impl From<AssociatedDataType> for EntityKind {
    fn from(value: AssociatedDataType) -> Self {
        match value {
            AssociatedDataType::Location => EntityKind::ProductLocation,
            AssociatedDataType::Grade => EntityKind::ProductGrade,
            AssociatedDataType::AccountingCategory => EntityKind::ProductAccountingCategory,
            AssociatedDataType::Discount => EntityKind::ProductDiscount,
            AssociatedDataType::Course => EntityKind::PackageCourse,
        }
    }
}

// ==========================================
// 套餐-课程下的产品可用性 (Package Association Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageAssociationType {
    Fee,
    Material,
}

impl From<PackageAssociationType> for EntityKind {
    fn from(value: PackageAssociationType) -> Self {
        match value {
            PackageAssociationType::Fee => EntityKind::PackageCourseFee,
            PackageAssociationType::Material => EntityKind::PackageCourseMaterial,
        }
    }
}
