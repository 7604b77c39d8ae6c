use std::collections::HashMap;
use std::sync::Arc;

use chipper_core::contracts::{FavoritedPost, FavoritedUser, FavoritesList};
use chipper_core::error::ChipperError;
use chipper_core::traits::{
    AuditAction, AuditLog, ContentStore, Favorite, FavoriteLedger, TargetKind,
};
use tracing::{info, warn};

/// Business operations for the favoriting domain.
///
/// The ledger's composite UNIQUE constraint is the source of truth for
/// duplicates. The `exists` pre-check only provides the friendly fast path;
/// a race lost at insert time surfaces the same error.
pub struct FavoriteService {
    ledger: Arc<dyn FavoriteLedger>,
    store: Arc<dyn ContentStore>,
    audit: Arc<dyn AuditLog>,
}

impl FavoriteService {
    pub fn new(
        ledger: Arc<dyn FavoriteLedger>,
        store: Arc<dyn ContentStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            ledger,
            store,
            audit,
        }
    }

    pub async fn favorite(
        &self,
        actor_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<Favorite, ChipperError> {
        // 1. No self-favoriting
        if target_kind == TargetKind::User && target_id == actor_id {
            return Err(ChipperError::SelfTarget {
                user_id: actor_id.to_string(),
            });
        }

        // 2. Friendly duplicate check
        if self.ledger.exists(actor_id, target_kind, target_id).await? {
            return Err(ChipperError::AlreadyFavorited {
                target_kind: target_kind.to_string(),
                target_id: target_id.to_string(),
            });
        }

        // 3. Insert. A race lost here still reports AlreadyFavorited via the
        //    storage constraint
        let favorite = self.ledger.insert(actor_id, target_kind, target_id).await?;

        info!(
            "⭐ Object favorited (user: {}, target: {}:{})",
            actor_id,
            target_kind.to_string(),
            target_id
        );
        if let Err(e) = self
            .audit
            .record(AuditAction::Favorited, actor_id, target_kind, target_id)
            .await
        {
            warn!("Audit write failed for favorite by {}: {}", actor_id, e);
        }

        Ok(favorite)
    }

    pub async fn unfavorite(
        &self,
        actor_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<(), ChipperError> {
        if !self.ledger.remove(actor_id, target_kind, target_id).await? {
            return Err(ChipperError::FavoriteNotFound {
                target_kind: target_kind.to_string(),
                target_id: target_id.to_string(),
            });
        }

        info!(
            "💔 Object unfavorited (user: {}, target: {}:{})",
            actor_id,
            target_kind.to_string(),
            target_id
        );
        if let Err(e) = self
            .audit
            .record(AuditAction::Unfavorited, actor_id, target_kind, target_id)
            .await
        {
            warn!("Audit write failed for unfavorite by {}: {}", actor_id, e);
        }

        Ok(())
    }

    /// Returns the actor's favorites partitioned by kind, each entry resolved
    /// against its target's current display attributes in one batch read per
    /// kind. Targets deleted since favoriting are silently omitted.
    pub async fn list_favorites(&self, actor_id: &str) -> Result<FavoritesList, ChipperError> {
        let favorites = self.ledger.list_by_actor(actor_id).await?;

        let post_ids: Vec<String> = favorites
            .iter()
            .filter(|f| f.target_kind == TargetKind::Post)
            .map(|f| f.target_id.clone())
            .collect();
        let user_ids: Vec<String> = favorites
            .iter()
            .filter(|f| f.target_kind == TargetKind::User)
            .map(|f| f.target_id.clone())
            .collect();

        let posts: HashMap<String, _> = self
            .store
            .fetch_posts(&post_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let users: HashMap<String, _> = self
            .store
            .fetch_users(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut list = FavoritesList::default();
        for favorite in favorites {
            match favorite.target_kind {
                TargetKind::Post => {
                    if let Some(post) = posts.get(&favorite.target_id) {
                        list.posts.push(FavoritedPost {
                            post_id: post.id.clone(),
                            title: post.title.clone(),
                            favorited_at: favorite.created_at.clone(),
                        });
                    }
                    // dangling target, omitted
                }
                TargetKind::User => {
                    if let Some(user) = users.get(&favorite.target_id) {
                        list.users.push(FavoritedUser {
                            user_id: user.id.clone(),
                            name: user.name.clone(),
                            favorited_at: favorite.created_at.clone(),
                        });
                    }
                }
            }
        }

        Ok(list)
    }
}
