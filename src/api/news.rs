use super::{non_empty, or_defaults};
use crate::{
    auth::AuthUser,
    entity::NewsArticle,
    error::{required, AppResult},
    repo::{NewArticle, SharedRepo},
    roles::Permission,
};
use axum::{extract::Path, http::StatusCode, routing::get, Extension, Json, Router};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateNewsRequest {
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
    #[serde(alias = "imageUrl")]
    image: Option<String>,
}

async fn list(Extension(repo): Extension<SharedRepo>) -> AppResult<Json<Vec<NewsArticle>>> {
    Ok(Json(or_defaults(repo.list_news().await, "news")?))
}

async fn create(
    Extension(repo): Extension<SharedRepo>,
    auth: AuthUser,
    Json(req): Json<CreateNewsRequest>,
) -> AppResult<(StatusCode, Json<NewsArticle>)> {
    auth.require(Permission::CreateNews)?;

    let article = NewArticle {
        title: required("title", req.title)?,
        content: required("content", req.content)?,
        category: non_empty(req.category).unwrap_or_else(|| "general".to_string()),
        image: non_empty(req.image),
        author_id: Some(auth.uid.clone()),
        author_name: auth.name.clone(),
    };

    Ok((StatusCode::CREATED, Json(repo.create_article(article).await?)))
}

async fn info(
    Extension(repo): Extension<SharedRepo>,
    Path(news_id): Path<String>,
) -> AppResult<Json<NewsArticle>> {
    Ok(Json(repo.article(&news_id).await?))
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:news_id", get(info))
}
