//! The portfolio table. Rows are only ever inserted and read.

use portfolio_shared::error::PortfolioError;
use portfolio_shared::intake::PortfolioCandidate;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder};
use tracing::{debug, error};

use crate::entity::portfolio;

/// Insert a validated candidate. The id is assigned by the database.
pub async fn create(
    conn: &DatabaseConnection,
    candidate: &PortfolioCandidate,
    profile_picture: Option<String>,
) -> Result<portfolio::Model, PortfolioError> {
    let new_portfolio = portfolio::ActiveModel {
        id: NotSet,
        first_name: Set(candidate.first_name.clone()),
        last_name: Set(candidate.last_name.clone()),
        email: Set(candidate.email.clone()),
        phone: Set(candidate.phone.clone()),
        profile_picture: Set(profile_picture),
        bio: Set(candidate.bio.clone()),
        skills: Set(candidate.skills.clone()),
        linkedin: Set(candidate.linkedin.clone()),
        github: Set(candidate.github.clone()),
    };

    let saved = new_portfolio
        .insert(conn)
        .await
        .inspect_err(|err| error!("Failed to save portfolio: {:?}", err))?;
    debug!("Created portfolio {}", saved.id);
    Ok(saved)
}

pub async fn get(conn: &DatabaseConnection, id: i32) -> Result<portfolio::Model, PortfolioError> {
    portfolio::Entity::find_by_id(id)
        .one(conn)
        .await
        .inspect_err(|err| error!("Failed to get portfolio {}: {:?}", id, err))?
        .ok_or_else(|| PortfolioError::NotFound(format!("Portfolio {id} not found")))
}

pub async fn list(conn: &DatabaseConnection) -> Result<Vec<portfolio::Model>, PortfolioError> {
    Ok(portfolio::Entity::find()
        .order_by_asc(portfolio::Column::Id)
        .all(conn)
        .await?)
}
