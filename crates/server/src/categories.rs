//! Categories API endpoints

use api_types::category::{CategoryNew, CategoryUpdate, CategoryView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    ServerError,
    server::ServerState,
    transactions::{kind_from_api, kind_to_api},
};
use engine::{Category, CategoryUpdateCmd, NewCategoryCmd, User};

fn category_view(category: Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: kind_to_api(category.kind),
        description: category.description,
        created_at: category.created_at,
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state.engine.list_categories(user.id).await?;
    Ok(Json(categories.into_iter().map(category_view).collect()))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(
            user.id,
            NewCategoryCmd {
                name: payload.name,
                kind: kind_from_api(payload.kind),
                description: payload.description,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(category_view(category))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state.engine.category(user.id, id).await?;
    Ok(Json(category_view(category)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state
        .engine
        .update_category(
            user.id,
            id,
            CategoryUpdateCmd {
                name: payload.name,
                kind: payload.kind.map(kind_from_api),
                description: payload.description,
            },
        )
        .await?;
    Ok(Json(category_view(category)))
}

/// Records of the category lose their category; its budgets are deleted.
pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
