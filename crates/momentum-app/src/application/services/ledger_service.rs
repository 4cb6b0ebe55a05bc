use std::sync::Arc;
use tracing::instrument;

use super::transaction::finish;
use crate::application::dtos::{BadgeDto, PointBalanceDto};
use momentum_domain::ledger::{strongest_multiplier, UnlockedTheme};
use momentum_domain::shared::{Clock, DomainError, UserId};
use momentum_domain::store::UnitOfWork;

/// Read side of what users have earned through claims and achievements
pub struct LedgerService {
    uow: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
}

impl LedgerService {
    pub fn new(uow: Arc<dyn UnitOfWork>, clock: Arc<dyn Clock>) -> Self {
        Self { uow, clock }
    }

    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_point_balance(&self, user_id: &UserId) -> Result<PointBalanceDto, DomainError> {
        let now = self.clock.now();
        let mut tx = self.uow.begin().await?;
        let result = async {
            let balance = tx.find_balance(user_id).await?;
            let multipliers = tx.active_multipliers(user_id, now).await?;
            let strongest = strongest_multiplier(&multipliers, now);

            Ok::<_, DomainError>(PointBalanceDto {
                balance: balance.as_ref().map_or(0, |b| b.balance()),
                active_multiplier: strongest.map(|m| m.factor),
                multiplier_expires_at: strongest.map(|m| m.expires_at.to_rfc3339()),
                updated_at: balance.map_or(now, |b| b.updated_at()).to_rfc3339(),
            })
        }
        .await;
        finish(tx, result).await
    }

    /// Badges held by the user, oldest first
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_badges(&self, user_id: &UserId) -> Result<Vec<BadgeDto>, DomainError> {
        let mut tx = self.uow.begin().await?;
        let result = tx
            .list_badges(user_id)
            .await
            .map(|badges| badges.iter().map(BadgeDto::from).collect());
        finish(tx, result).await
    }

    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn get_unlocked_themes(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<UnlockedTheme>, DomainError> {
        let mut tx = self.uow.begin().await?;
        let result = tx.list_themes(user_id).await;
        finish(tx, result).await
    }
}
