// ==========================================
// 计费主数据导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有值使用参数化绑定;表名/列名只来自静态导入规格
// ==========================================

pub mod error;
pub mod master_data_repo;
pub mod master_data_repo_impl;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use master_data_repo::MasterDataRepository;
pub use master_data_repo_impl::MasterDataRepositoryImpl;
