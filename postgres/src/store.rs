//! [`Store`] implementation over a `PostgreSQL` pool.

use async_trait::async_trait;
use mintpass_core::error::StoreError;
use mintpass_core::providers::Store;
use mintpass_core::types::{
    Accounting, Claim, Drops, Event, EventId, EventStatus, NetworkId, Nft, OfferIndex, TxHash,
    User, WalletAddress,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use uuid::Uuid;

/// Pool configuration.
#[derive(Clone, Debug)]
pub struct PgStoreConfig {
    /// Connection URL.
    pub url: String,
    /// Maximum pool size.
    pub max_connections: u32,
    /// Connect timeout.
    pub connect_timeout: Duration,
}

/// `PostgreSQL`-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pool cannot be established.
    pub async fn connect(config: &PgStoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Database(format!("failed to connect pool: {e}")))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Close the pool; part of explicit service teardown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ════════════════════════════════════════════════════════════════════════
// Row mapping
// ════════════════════════════════════════════════════════════════════════

fn db_err(err: sqlx::Error) -> StoreError {
    if let Some(database) = err.as_database_error() {
        // 23505 = unique_violation: surfaced as Conflict so callers can
        // treat lost races (claims, attendees) as domain conditions.
        if database.code().as_deref() == Some("23505") {
            return StoreError::Conflict(database.message().to_string());
        }
    }
    StoreError::Database(err.to_string())
}

fn event_id_from(raw: i64) -> Result<EventId, StoreError> {
    u32::try_from(raw)
        .map(EventId::new)
        .map_err(|_| StoreError::Database(format!("event id {raw} out of range")))
}

fn status_from(raw: i16) -> Result<EventStatus, StoreError> {
    EventStatus::from_code(raw)
        .ok_or_else(|| StoreError::Database(format!("unknown event status code {raw}")))
}

fn drops_from(raw: &str) -> Result<Drops, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Database(format!("non-integer drops value {raw:?}")))
}

fn token_count_from(raw: i64) -> Result<u32, StoreError> {
    u32::try_from(raw)
        .map_err(|_| StoreError::Database(format!("token count {raw} out of range")))
}

fn event_from_row(row: &PgRow) -> Result<Event, StoreError> {
    Ok(Event {
        id: event_id_from(row.try_get("id").map_err(db_err)?)?,
        owner: WalletAddress::new(row.try_get::<String, _>("owner_wallet").map_err(db_err)?),
        network: NetworkId::new(row.try_get::<String, _>("network").map_err(db_err)?),
        status: status_from(row.try_get("status").map_err(db_err)?)?,
        title: row.try_get("title").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        location: row.try_get("location").map_err(db_err)?,
        image_url: row.try_get("image_url").map_err(db_err)?,
        token_count: token_count_from(row.try_get("token_count").map_err(db_err)?)?,
        uri: row.try_get("uri").map_err(db_err)?,
        starts_at: row.try_get("starts_at").map_err(db_err)?,
        ends_at: row.try_get("ends_at").map_err(db_err)?,
        is_managed: row.try_get("is_managed").map_err(db_err)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let slots: i64 = row.try_get("slots").map_err(db_err)?;
    Ok(User {
        wallet: WalletAddress::new(row.try_get::<String, _>("wallet").map_err(db_err)?),
        first_name: row.try_get("first_name").map_err(db_err)?,
        last_name: row.try_get("last_name").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        is_organizer: row.try_get("is_organizer").map_err(db_err)?,
        is_admin: row.try_get("is_admin").map_err(db_err)?,
        slots: u32::try_from(slots)
            .map_err(|_| StoreError::Database(format!("slots {slots} out of range")))?,
    })
}

fn accounting_from_row(row: &PgRow) -> Result<Accounting, StoreError> {
    Ok(Accounting {
        event_id: event_id_from(row.try_get("event_id").map_err(db_err)?)?,
        deposit_address: WalletAddress::new(
            row.try_get::<String, _>("deposit_address").map_err(db_err)?,
        ),
        deposit_reserve: drops_from(&row.try_get::<String, _>("deposit_reserve").map_err(db_err)?)?,
        deposit_fee: drops_from(&row.try_get::<String, _>("deposit_fee").map_err(db_err)?)?,
        deposit_tx_hash: row
            .try_get::<Option<String>, _>("deposit_tx_hash")
            .map_err(db_err)?
            .map(TxHash::new),
        refund_value: row
            .try_get::<Option<String>, _>("refund_value")
            .map_err(db_err)?
            .as_deref()
            .map(drops_from)
            .transpose()?,
        refund_tx_hash: row
            .try_get::<Option<String>, _>("refund_tx_hash")
            .map_err(db_err)?
            .map(TxHash::new),
        accumulated_tx_fees: drops_from(
            &row.try_get::<String, _>("accumulated_tx_fees").map_err(db_err)?,
        )?,
    })
}

fn claim_from_row(row: &PgRow) -> Result<Claim, StoreError> {
    Ok(Claim {
        id: row.try_get("id").map_err(db_err)?,
        wallet: WalletAddress::new(row.try_get::<String, _>("wallet").map_err(db_err)?),
        token_id: mintpass_core::types::TokenId::new(
            row.try_get::<String, _>("token_id").map_err(db_err)?,
        ),
        event_id: event_id_from(row.try_get("event_id").map_err(db_err)?)?,
        offer_index: row
            .try_get::<Option<String>, _>("offer_index")
            .map_err(db_err)?
            .map(OfferIndex::new),
        claimed: row.try_get("claimed").map_err(db_err)?,
    })
}

// ════════════════════════════════════════════════════════════════════════
// Store implementation
// ════════════════════════════════════════════════════════════════════════

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO users (wallet, first_name, last_name, email, is_organizer, is_admin, slots)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(user.wallet.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.is_organizer)
        .bind(user.is_admin)
        .bind(i64::from(user.slots))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_user(&self, wallet: &WalletAddress) -> Result<Option<User>, StoreError> {
        sqlx::query("SELECT * FROM users WHERE wallet = $1")
            .bind(wallet.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET first_name = $2, last_name = $3, email = $4,
                is_organizer = $5, is_admin = $6, slots = $7
            WHERE wallet = $1
            ",
        )
        .bind(user.wallet.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.is_organizer)
        .bind(user.is_admin)
        .bind(i64::from(user.slots))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "user",
                key: user.wallet.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_event(
        &self,
        event: &Event,
        accounting: &Accounting,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO events (id, owner_wallet, network, status, title, description,
                                location, image_url, token_count, uri, starts_at, ends_at,
                                is_managed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(i64::from(event.id.get()))
        .bind(event.owner.as_str())
        .bind(event.network.as_str())
        .bind(event.status.code())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.image_url)
        .bind(i64::from(event.token_count))
        .bind(&event.uri)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.is_managed)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO accounting (event_id, deposit_address, deposit_reserve, deposit_fee,
                                    accumulated_tx_fees)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(i64::from(accounting.event_id.get()))
        .bind(accounting.deposit_address.as_str())
        .bind(accounting.deposit_reserve.to_string())
        .bind(accounting.deposit_fee.to_string())
        .bind(accounting.accumulated_tx_fees.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        metrics::counter!("mintpass.store.events_created").increment(1);
        Ok(())
    }

    async fn find_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        sqlx::query("SELECT * FROM events WHERE id = $1")
            .bind(i64::from(id.get()))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| event_from_row(&row))
            .transpose()
    }

    async fn list_events(
        &self,
        status: Option<EventStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r"
                    SELECT * FROM events WHERE status = $1
                    ORDER BY id DESC LIMIT $2 OFFSET $3
                    ",
                )
                .bind(status.code())
                .bind(i64::from(limit))
                .bind(i64::from(offset))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM events ORDER BY id DESC LIMIT $1 OFFSET $2")
                    .bind(i64::from(limit))
                    .bind(i64::from(offset))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(event_from_row).collect()
    }

    async fn max_event_id(&self) -> Result<Option<EventId>, StoreError> {
        let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        row.0.map(event_id_from).transpose()
    }

    async fn set_event_uri(&self, id: EventId, uri: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE events SET uri = $2 WHERE id = $1")
            .bind(i64::from(id.get()))
            .bind(uri)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "event",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        id: EventId,
        expected: &[EventStatus],
        next: EventStatus,
    ) -> Result<Option<Event>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Row lock so two transitions cannot race past the same guard.
        let current: Option<(i16,)> =
            sqlx::query_as("SELECT status FROM events WHERE id = $1 FOR UPDATE")
                .bind(i64::from(id.get()))
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;

        let Some((code,)) = current else {
            return Err(StoreError::NotFound {
                entity: "event",
                key: id.to_string(),
            });
        };

        let status = status_from(code)?;
        if !expected.contains(&status) {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        }

        let row = sqlx::query("UPDATE events SET status = $2 WHERE id = $1 RETURNING *")
            .bind(i64::from(id.get()))
            .bind(next.code())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        let event = event_from_row(&row)?;

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(event = %id, from = %status, to = %next, "event status transitioned");
        Ok(Some(event))
    }

    async fn open_token_count(&self, owner: &WalletAddress) -> Result<u64, StoreError> {
        // SUM(bigint) widens to NUMERIC; cast back down for decoding.
        let row: (i64,) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(token_count), 0)::BIGINT FROM events
            WHERE owner_wallet = $1 AND status IN ($2, $3, $4)
            ",
        )
        .bind(owner.as_str())
        .bind(EventStatus::Draft.code())
        .bind(EventStatus::Paid.code())
        .bind(EventStatus::Active.code())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(u64::try_from(row.0).unwrap_or(0))
    }

    async fn accounting_for(&self, id: EventId) -> Result<Option<Accounting>, StoreError> {
        sqlx::query("SELECT * FROM accounting WHERE event_id = $1")
            .bind(i64::from(id.get()))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| accounting_from_row(&row))
            .transpose()
    }

    async fn record_deposit(&self, id: EventId, tx: &TxHash) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE accounting SET deposit_tx_hash = $2 WHERE event_id = $1")
                .bind(i64::from(id.get()))
                .bind(tx.as_str())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "accounting for event",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    async fn record_refund(
        &self,
        id: EventId,
        value: Drops,
        tx: &TxHash,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE accounting SET refund_value = $2, refund_tx_hash = $3 WHERE event_id = $1",
        )
        .bind(i64::from(id.get()))
        .bind(value.to_string())
        .bind(tx.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "accounting for event",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    async fn add_tx_fee(&self, id: EventId, fee: Drops) -> Result<(), StoreError> {
        // NUMERIC arithmetic on the TEXT column keeps arbitrary precision.
        let result = sqlx::query(
            r"
            UPDATE accounting
            SET accumulated_tx_fees = (accumulated_tx_fees::NUMERIC + $2::NUMERIC)::TEXT
            WHERE event_id = $1
            ",
        )
        .bind(i64::from(id.get()))
        .bind(fee.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "accounting for event",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    async fn upsert_nft(&self, nft: &Nft) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO nfts (token_id, issuer, event_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (token_id) DO NOTHING
            ",
        )
        .bind(nft.token_id.as_str())
        .bind(nft.issuer.as_str())
        .bind(i64::from(nft.event_id.get()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn nfts_for_event(&self, id: EventId) -> Result<Vec<Nft>, StoreError> {
        let rows = sqlx::query("SELECT * FROM nfts WHERE event_id = $1 ORDER BY ord")
            .bind(i64::from(id.get()))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                Ok(Nft {
                    token_id: mintpass_core::types::TokenId::new(
                        row.try_get::<String, _>("token_id").map_err(db_err)?,
                    ),
                    issuer: WalletAddress::new(
                        row.try_get::<String, _>("issuer").map_err(db_err)?,
                    ),
                    event_id: event_id_from(row.try_get("event_id").map_err(db_err)?)?,
                })
            })
            .collect()
    }

    async fn insert_claim(&self, claim: &Claim) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO claims (id, wallet, token_id, event_id, offer_index, claimed)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(claim.id)
        .bind(claim.wallet.as_str())
        .bind(claim.token_id.as_str())
        .bind(i64::from(claim.event_id.get()))
        .bind(claim.offer_index.as_ref().map(OfferIndex::as_str))
        .bind(claim.claimed)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn claim_for(
        &self,
        wallet: &WalletAddress,
        event: EventId,
    ) -> Result<Option<Claim>, StoreError> {
        sqlx::query("SELECT * FROM claims WHERE wallet = $1 AND event_id = $2")
            .bind(wallet.as_str())
            .bind(i64::from(event.get()))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| claim_from_row(&row))
            .transpose()
    }

    async fn claims_for_event(&self, event: EventId) -> Result<Vec<Claim>, StoreError> {
        let rows = sqlx::query("SELECT * FROM claims WHERE event_id = $1")
            .bind(i64::from(event.get()))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(claim_from_row).collect()
    }

    async fn set_claim_offer(&self, id: Uuid, offer: &OfferIndex) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE claims SET offer_index = $2 WHERE id = $1")
            .bind(id)
            .bind(offer.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "claim",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    async fn mark_claimed(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE claims SET claimed = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "claim",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    async fn pending_claims(&self) -> Result<Vec<(Claim, NetworkId)>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT c.*, e.network FROM claims c
            JOIN events e ON e.id = c.event_id
            WHERE c.offer_index IS NOT NULL AND NOT c.claimed
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let claim = claim_from_row(row)?;
                let network =
                    NetworkId::new(row.try_get::<String, _>("network").map_err(db_err)?);
                Ok((claim, network))
            })
            .collect()
    }

    async fn add_attendee(
        &self,
        event: EventId,
        wallet: &WalletAddress,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO attendees (event_id, wallet) VALUES ($1, $2)")
            .bind(i64::from(event.get()))
            .bind(wallet.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn remove_attendee(
        &self,
        event: EventId,
        wallet: &WalletAddress,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM attendees WHERE event_id = $1 AND wallet = $2")
            .bind(i64::from(event.get()))
            .bind(wallet.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn count_attendees(&self, event: EventId) -> Result<u32, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attendees WHERE event_id = $1")
            .bind(i64::from(event.get()))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(u32::try_from(row.0).unwrap_or(u32::MAX))
    }

    async fn is_attendee(
        &self,
        event: EventId,
        wallet: &WalletAddress,
    ) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM attendees WHERE event_id = $1 AND wallet = $2)",
        )
        .bind(i64::from(event.get()))
        .bind(wallet.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.0)
    }

    async fn attendees(&self, event: EventId) -> Result<Vec<WalletAddress>, StoreError> {
        let rows =
            sqlx::query("SELECT wallet FROM attendees WHERE event_id = $1 ORDER BY wallet")
                .bind(i64::from(event.get()))
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                Ok(WalletAddress::new(
                    row.try_get::<String, _>("wallet").map_err(db_err)?,
                ))
            })
            .collect()
    }
}
