use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::FindOptions,
    Collection,
};
use serde::de::DeserializeOwned;

use crate::utils::{AppError, Paginated, Pagination};

/// count + skip/limit find, the shape every list endpoint returns
pub async fn find_page<T>(
    collection: &Collection<T>,
    filter: Document,
    sort: Document,
    pagination: Pagination,
) -> Result<Paginated<T>, AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let total = collection.count_documents(filter.clone()).await?;

    let options = FindOptions::builder()
        .sort(sort)
        .skip(pagination.skip())
        .limit(pagination.limit as i64)
        .build();

    let items: Vec<T> = collection.find(filter).with_options(options).await?.try_collect().await?;

    Ok(Paginated::new(items, total, pagination))
}

pub async fn find_by_id<T>(collection: &Collection<T>, id: &ObjectId, what: &str) -> Result<T, AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    collection
        .find_one(doc! { "_id": *id })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", what)))
}

/// Runs `pipeline` and decodes every output document as `R`.
pub async fn aggregate_rows<T, R>(collection: &Collection<T>, pipeline: Vec<Document>) -> Result<Vec<R>, AppError>
where
    T: Send + Sync,
    R: DeserializeOwned,
{
    let docs: Vec<Document> = collection.aggregate(pipeline).await?.try_collect().await?;
    docs.into_iter()
        .map(|d| mongodb::bson::from_document(d).map_err(AppError::from))
        .collect()
}
