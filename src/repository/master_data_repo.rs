// ==========================================
// 计费主数据导入系统 - 主数据 Repository Trait
// ==========================================
// 职责: 定义导入相关数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做键集合读取与整批写入
// ==========================================

use crate::domain::import_record::TypedRow;
use crate::domain::import_spec::{ImportSpec, KeySpace, ReferenceKeys};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::HashSet;

// ==========================================
// MasterDataRepository Trait
// ==========================================
// 实现者: MasterDataRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait MasterDataRepository: Send + Sync {
    // ===== 键集合读取 =====

    /// 读取一个键空间的全部键
    ///
    /// # 返回
    /// - Ok(HashSet<String>): 键的文本形式
    async fn fetch_key_set(&self, space: KeySpace) -> RepositoryResult<HashSet<String>>;

    /// 批量读取多个键空间（每个键空间只查询一次）
    async fn fetch_reference_keys(&self, spaces: &[KeySpace]) -> RepositoryResult<ReferenceKeys> {
        let mut keys = ReferenceKeys::with_capacity(spaces.len());
        for space in spaces {
            if keys.contains_key(space) {
                continue;
            }
            let set = self.fetch_key_set(*space).await?;
            keys.insert(*space, set);
        }
        Ok(keys)
    }

    // ===== 批量写入（事务化）=====

    /// 按规格的键模式整批提交
    ///
    /// # 参数
    /// - spec: 目标实体族规格
    /// - rows: 已通过全部校验的行
    ///
    /// # 返回
    /// - Ok(usize): 提交的行数
    /// - Err: 数据库错误（整个事务回滚）
    async fn commit_batch(
        &self,
        spec: &'static ImportSpec,
        rows: Vec<TypedRow>,
    ) -> RepositoryResult<usize>;
}
