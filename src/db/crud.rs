use sqlx::{Executor, Result, Sqlite, SqlitePool};

use super::{FeaturesRecord, ImageRecord, SignatureRecord};

/// 添加图片记录
pub async fn add_image<'c, E>(executor: E, hash: &[u8], path: &str) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO image (hash, path)
        VALUES (?, ?)
        RETURNING id
        "#,
    )
    .bind(hash)
    .bind(path)
    .fetch_one(executor)
    .await
}

/// 根据哈希查找图片 ID
pub async fn find_image_by_hash(executor: &SqlitePool, hash: &[u8]) -> Result<Option<i64>> {
    sqlx::query_scalar("SELECT id FROM image WHERE hash = ?")
        .bind(hash)
        .fetch_optional(executor)
        .await
}

pub async fn update_image_path(executor: &SqlitePool, id: i64, path: &str) -> Result<()> {
    sqlx::query("UPDATE image SET path = ? WHERE id = ?")
        .bind(path)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn get_image_path(executor: &SqlitePool, id: i64) -> Result<Option<String>> {
    sqlx::query_scalar("SELECT path FROM image WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_images(executor: &SqlitePool) -> Result<Vec<ImageRecord>> {
    sqlx::query_as("SELECT id, path FROM image ORDER BY id ASC").fetch_all(executor).await
}

pub async fn count_images(executor: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM image").fetch_one(executor).await
}

/// 删除图片，特征点与 VLAD 向量会级联删除
pub async fn delete_image(executor: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM image WHERE id = ?").bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}

/// 添加特征点
pub async fn add_features<'c, E>(executor: E, record: &FeaturesRecord) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO features (id, dim, count, keypoints, descriptors)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id)
    .bind(record.dim)
    .bind(record.count)
    .bind(&record.keypoints)
    .bind(&record.descriptors)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_features(executor: &SqlitePool, id: i64) -> Result<Option<FeaturesRecord>> {
    sqlx::query_as("SELECT id, dim, count, keypoints, descriptors FROM features WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// 获取所有图片的特征点，按图片 ID 排序
pub async fn get_all_features(executor: &SqlitePool) -> Result<Vec<FeaturesRecord>> {
    sqlx::query_as("SELECT id, dim, count, keypoints, descriptors FROM features ORDER BY id ASC")
        .fetch_all(executor)
        .await
}

/// 批量写入 VLAD 向量，会先清空旧的向量
pub async fn replace_signatures(executor: &SqlitePool, records: &[SignatureRecord]) -> Result<()> {
    let mut tx = executor.begin().await?;
    sqlx::query("DELETE FROM signature").execute(&mut *tx).await?;
    for record in records {
        sqlx::query("INSERT INTO signature (id, vector) VALUES (?, ?)")
            .bind(record.id)
            .bind(&record.vector)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn get_signatures(executor: &SqlitePool) -> Result<Vec<SignatureRecord>> {
    sqlx::query_as("SELECT id, vector FROM signature ORDER BY id ASC").fetch_all(executor).await
}

pub async fn count_signatures(executor: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM signature").fetch_one(executor).await
}

pub async fn delete_signatures(executor: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM signature").execute(executor).await?;
    Ok(())
}
