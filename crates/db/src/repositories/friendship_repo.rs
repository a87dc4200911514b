//! Repository for the `friend_requests` and `friendships` tables.

use sqlx::{PgPool, Postgres, Transaction};
use taskwatch_core::error::CoreError;
use taskwatch_core::friendship::{authorize_action, canonical_pair, RequestAction};
use taskwatch_core::status::FriendRequestStatus;
use taskwatch_core::types::DbId;

use crate::error::RepoError;
use crate::models::friendship::{
    FriendRequest, FriendRequestView, FriendRequestViewRow, Friendship, FriendshipView,
    FriendshipViewRow, RespondOutcome, SendOutcome,
};

/// Column list for `friend_requests` queries.
const REQUEST_COLUMNS: &str =
    "id, requester_id, receiver_id, status_id, created_at, responded_at";

/// Column list for `friendships` queries.
const FRIENDSHIP_COLUMNS: &str = "id, user_a_id, user_b_id, created_at";

/// Request columns qualified with `r.` plus both users' public fields.
const REQUEST_VIEW_COLUMNS: &str = "r.id, r.requester_id, r.receiver_id, r.status_id, \
    r.created_at, r.responded_at, \
    rq.name AS requester_name, rq.email AS requester_email, \
    rq.avatar_color AS requester_avatar_color, \
    rc.name AS receiver_name, rc.email AS receiver_email, \
    rc.avatar_color AS receiver_avatar_color";

pub struct FriendshipRepo;

impl FriendshipRepo {
    // -----------------------------------------------------------------------
    // Friend graph reads
    // -----------------------------------------------------------------------

    /// The viewer followed by their friends, in friendship creation order.
    pub async fn circle_ids(pool: &PgPool, viewer_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        let friends: Vec<DbId> = sqlx::query_scalar(
            "SELECT CASE WHEN user_a_id = $1 THEN user_b_id ELSE user_a_id END \
             FROM friendships \
             WHERE user_a_id = $1 OR user_b_id = $1 \
             ORDER BY id",
        )
        .bind(viewer_id)
        .fetch_all(pool)
        .await?;

        let mut ids = Vec::with_capacity(friends.len() + 1);
        ids.push(viewer_id);
        ids.extend(friends);
        Ok(ids)
    }

    /// Users are trivially friends with themselves.
    pub async fn are_friends(pool: &PgPool, a: DbId, b: DbId) -> Result<bool, sqlx::Error> {
        if a == b {
            return Ok(true);
        }
        let (first, second) = canonical_pair(a, b);
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM friendships WHERE user_a_id = $1 AND user_b_id = $2)",
        )
        .bind(first)
        .bind(second)
        .fetch_one(pool)
        .await
    }

    /// The viewer's friendships, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        viewer_id: DbId,
    ) -> Result<Vec<FriendshipView>, sqlx::Error> {
        let rows = sqlx::query_as::<_, FriendshipViewRow>(
            "SELECT f.id, f.created_at, \
                    u.id AS friend_id, u.name AS friend_name, \
                    u.email AS friend_email, u.avatar_color AS friend_avatar_color \
             FROM friendships f \
             JOIN users u ON u.id = CASE WHEN f.user_a_id = $1 THEN f.user_b_id ELSE f.user_a_id END \
             WHERE f.user_a_id = $1 OR f.user_b_id = $1 \
             ORDER BY f.created_at DESC, f.id DESC",
        )
        .bind(viewer_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Either member may remove a friendship.
    pub async fn delete(pool: &PgPool, id: DbId, viewer_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM friendships WHERE id = $1 AND (user_a_id = $2 OR user_b_id = $2)",
        )
        .bind(id)
        .bind(viewer_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Ask `target_id` to be friends.
    ///
    /// When the target already has a pending request to the viewer, that
    /// request is accepted and the friendship created in the same transaction.
    pub async fn send_request(
        pool: &PgPool,
        viewer_id: DbId,
        target_id: DbId,
    ) -> Result<SendOutcome, RepoError> {
        let mut tx = pool.begin().await?;

        let target_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(target_id)
                .fetch_one(&mut *tx)
                .await?;
        if !target_exists {
            return Err(CoreError::not_found("USER_NOT_FOUND", "Friend user was not found.").into());
        }

        Self::lock_pair(&mut tx, viewer_id, target_id).await?;

        let (first, second) = canonical_pair(viewer_id, target_id);
        let already_friends: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM friendships WHERE user_a_id = $1 AND user_b_id = $2)",
        )
        .bind(first)
        .bind(second)
        .fetch_one(&mut *tx)
        .await?;
        if already_friends {
            return Err(CoreError::conflict("ALREADY_FRIENDS", "Friendship already exists.").into());
        }

        let pending = FriendRequestStatus::Pending.id();
        let incoming_query = format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests \
             WHERE requester_id = $1 AND receiver_id = $2 AND status_id = $3 \
             ORDER BY id LIMIT 1 \
             FOR UPDATE"
        );
        let incoming = sqlx::query_as::<_, FriendRequest>(&incoming_query)
            .bind(target_id)
            .bind(viewer_id)
            .bind(pending)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(incoming) = incoming {
            let request =
                Self::set_status(&mut tx, incoming.id, FriendRequestStatus::Accepted).await?;
            let friendship = Self::insert_friendship(&mut tx, viewer_id, target_id).await?;
            tx.commit().await?;
            return Ok(SendOutcome::Accepted {
                friendship,
                request,
            });
        }

        let outgoing: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM friend_requests \
                WHERE requester_id = $1 AND receiver_id = $2 AND status_id = $3)",
        )
        .bind(viewer_id)
        .bind(target_id)
        .bind(pending)
        .fetch_one(&mut *tx)
        .await?;
        if outgoing {
            return Err(
                CoreError::conflict("REQUEST_ALREADY_EXISTS", "Friend request already sent.")
                    .into(),
            );
        }

        let insert_query = format!(
            "INSERT INTO friend_requests (requester_id, receiver_id) VALUES ($1, $2) \
             RETURNING {REQUEST_COLUMNS}"
        );
        let request = sqlx::query_as::<_, FriendRequest>(&insert_query)
            .bind(viewer_id)
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(SendOutcome::Requested(request))
    }

    /// Accept, reject or cancel a pending request.
    ///
    /// The request row is locked so two concurrent responses cannot both
    /// observe it as pending.
    pub async fn respond(
        pool: &PgPool,
        id: DbId,
        viewer_id: DbId,
        action: RequestAction,
    ) -> Result<RespondOutcome, RepoError> {
        let mut tx = pool.begin().await?;

        let members: Option<(DbId, DbId)> =
            sqlx::query_as("SELECT requester_id, receiver_id FROM friend_requests WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let (requester_id, receiver_id) = members
            .ok_or_else(|| CoreError::not_found("REQUEST_NOT_FOUND", "Friend request not found."))?;
        // Pair lock before the row lock, in the same order as `send_request`.
        Self::lock_pair(&mut tx, requester_id, receiver_id).await?;

        let lock_query =
            format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, FriendRequest>(&lock_query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::not_found("REQUEST_NOT_FOUND", "Friend request not found."))?;

        authorize_action(
            action,
            current.status,
            current.requester_id,
            current.receiver_id,
            viewer_id,
        )?;

        let request = Self::set_status(&mut tx, id, action.resulting_status()).await?;
        let friendship = if action == RequestAction::Accept {
            Some(Self::insert_friendship(&mut tx, current.requester_id, current.receiver_id).await?)
        } else {
            None
        };

        tx.commit().await?;
        Ok(RespondOutcome {
            request,
            friendship,
        })
    }

    /// Requests received by (`received = true`) or sent by the viewer with
    /// one of `statuses`, newest first.
    pub async fn list_requests(
        pool: &PgPool,
        viewer_id: DbId,
        received: bool,
        statuses: &[FriendRequestStatus],
    ) -> Result<Vec<FriendRequestView>, sqlx::Error> {
        let side = if received { "r.receiver_id" } else { "r.requester_id" };
        let query = format!(
            "SELECT {REQUEST_VIEW_COLUMNS} FROM friend_requests r \
             JOIN users rq ON rq.id = r.requester_id \
             JOIN users rc ON rc.id = r.receiver_id \
             WHERE {side} = $1 AND r.status_id = ANY($2) \
             ORDER BY r.created_at DESC, r.id DESC"
        );
        let ids: Vec<i16> = statuses.iter().map(|s| s.id()).collect();
        let rows = sqlx::query_as::<_, FriendRequestViewRow>(&query)
            .bind(viewer_id)
            .bind(ids)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_request_view(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<FriendRequestView>, sqlx::Error> {
        let query = format!(
            "SELECT {REQUEST_VIEW_COLUMNS} FROM friend_requests r \
             JOIN users rq ON rq.id = r.requester_id \
             JOIN users rc ON rc.id = r.receiver_id \
             WHERE r.id = $1"
        );
        let row = sqlx::query_as::<_, FriendRequestViewRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    // -----------------------------------------------------------------------
    // Transaction helpers
    // -----------------------------------------------------------------------

    /// Serialize every request/response touching the unordered pair `{a, b}`
    /// until the transaction ends.
    ///
    /// A pending request that does not exist yet cannot be row-locked, so the
    /// mutual-request check relies on this lock instead. Ids are folded into
    /// the two `int4` advisory keys; a fold collision only serializes two
    /// unrelated pairs.
    async fn lock_pair(
        tx: &mut Transaction<'_, Postgres>,
        a: DbId,
        b: DbId,
    ) -> Result<(), sqlx::Error> {
        let (first, second) = canonical_pair(a, b);
        sqlx::query(
            "SELECT pg_advisory_xact_lock(($1 % 2147483647)::INT4, ($2 % 2147483647)::INT4)",
        )
        .bind(first)
        .bind(second)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn set_status(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        status: FriendRequestStatus,
    ) -> Result<FriendRequest, sqlx::Error> {
        let query = format!(
            "UPDATE friend_requests SET status_id = $2, responded_at = now() \
             WHERE id = $1 \
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, FriendRequest>(&query)
            .bind(id)
            .bind(status.id())
            .fetch_one(&mut **tx)
            .await
    }

    /// Insert the canonical pair, returning the existing row if it is already there.
    async fn insert_friendship(
        tx: &mut Transaction<'_, Postgres>,
        a: DbId,
        b: DbId,
    ) -> Result<Friendship, sqlx::Error> {
        let (first, second) = canonical_pair(a, b);
        let query = format!(
            "INSERT INTO friendships (user_a_id, user_b_id) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT uq_friendships_pair \
                DO UPDATE SET user_a_id = EXCLUDED.user_a_id \
             RETURNING {FRIENDSHIP_COLUMNS}"
        );
        sqlx::query_as::<_, Friendship>(&query)
            .bind(first)
            .bind(second)
            .fetch_one(&mut **tx)
            .await
    }
}
