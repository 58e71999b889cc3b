// SPDX-License-Identifier: BUSL-1.1
//! Wager record persistence.
//!
//! Save/load functions for wager records and their cascading children.
//! The wager row is upserted; acceptances and proofs are insert-only
//! (immutable once written); disputes are upserted so resolution fields
//! land on retry.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bounty_core::{Amount, DisputeId, ProofId, UserId, WagerId};
use bounty_engine::{
    Acceptance, Dispute, DisputeResolution, Evidence, EvidenceKind, Proof, Wager, WagerRecord,
    WagerState,
};

/// Create the tables when they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS wagers (
            wager_id UUID PRIMARY KEY,
            creator UUID NOT NULL,
            acceptor UUID,
            target_user UUID,
            winner UUID,
            game TEXT NOT NULL,
            description TEXT NOT NULL,
            stake_amount BIGINT NOT NULL,
            payout_amount BIGINT,
            platform_fee BIGINT,
            state TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            accepted_at TIMESTAMPTZ,
            started_at TIMESTAMPTZ,
            result_submitted_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ,
            expires_at TIMESTAMPTZ NOT NULL,
            transition_log JSONB NOT NULL DEFAULT '[]'::jsonb
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS wager_acceptances (
            wager_id UUID PRIMARY KEY REFERENCES wagers(wager_id),
            acceptor UUID NOT NULL,
            accepted_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS wager_proofs (
            proof_id UUID PRIMARY KEY,
            wager_id UUID NOT NULL REFERENCES wagers(wager_id),
            submitter UUID NOT NULL,
            claimed_winner UUID NOT NULL,
            evidence_url TEXT NOT NULL,
            evidence_kind TEXT NOT NULL,
            submitted_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS wager_disputes (
            dispute_id UUID PRIMARY KEY,
            wager_id UUID NOT NULL UNIQUE REFERENCES wagers(wager_id),
            disputer UUID NOT NULL,
            reason TEXT NOT NULL,
            moderator UUID,
            resolution TEXT,
            resolved_by UUID,
            opened_at TIMESTAMPTZ NOT NULL,
            resolved_at TIMESTAMPTZ
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Save a wager record and its children (upsert).
pub async fn save_wager_record(pool: &PgPool, record: &WagerRecord) -> Result<(), sqlx::Error> {
    let w = &record.wager;
    let transition_log = serde_json::to_value(&w.transition_log)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize transition log: {e}")))?;

    sqlx::query(
        "INSERT INTO wagers (wager_id, creator, acceptor, target_user, winner, game, description,
                             stake_amount, payout_amount, platform_fee, state, created_at,
                             accepted_at, started_at, result_submitted_at, completed_at,
                             expires_at, transition_log)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
         ON CONFLICT (wager_id) DO UPDATE SET
            acceptor = EXCLUDED.acceptor,
            winner = EXCLUDED.winner,
            payout_amount = EXCLUDED.payout_amount,
            platform_fee = EXCLUDED.platform_fee,
            state = EXCLUDED.state,
            accepted_at = EXCLUDED.accepted_at,
            started_at = EXCLUDED.started_at,
            result_submitted_at = EXCLUDED.result_submitted_at,
            completed_at = EXCLUDED.completed_at,
            transition_log = EXCLUDED.transition_log",
    )
    .bind(w.id.as_uuid())
    .bind(w.creator.as_uuid())
    .bind(w.acceptor.as_ref().map(|u| *u.as_uuid()))
    .bind(w.target_user.as_ref().map(|u| *u.as_uuid()))
    .bind(w.winner.as_ref().map(|u| *u.as_uuid()))
    .bind(&w.game)
    .bind(&w.description)
    .bind(amount_to_db(w.stake_amount)?)
    .bind(w.payout_amount.map(amount_to_db).transpose()?)
    .bind(w.platform_fee.map(amount_to_db).transpose()?)
    .bind(w.state.as_str())
    .bind(w.created_at)
    .bind(w.accepted_at)
    .bind(w.started_at)
    .bind(w.result_submitted_at)
    .bind(w.completed_at)
    .bind(w.expires_at)
    .bind(&transition_log)
    .execute(pool)
    .await?;

    if let Some(acceptance) = &record.acceptance {
        sqlx::query(
            "INSERT INTO wager_acceptances (wager_id, acceptor, accepted_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (wager_id) DO NOTHING",
        )
        .bind(acceptance.wager_id.as_uuid())
        .bind(acceptance.acceptor.as_uuid())
        .bind(acceptance.accepted_at)
        .execute(pool)
        .await?;
    }

    for proof in &record.proofs {
        sqlx::query(
            "INSERT INTO wager_proofs (proof_id, wager_id, submitter, claimed_winner,
                                       evidence_url, evidence_kind, submitted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (proof_id) DO NOTHING",
        )
        .bind(proof.id.as_uuid())
        .bind(proof.wager_id.as_uuid())
        .bind(proof.submitter.as_uuid())
        .bind(proof.claimed_winner.as_uuid())
        .bind(&proof.evidence.url)
        .bind(proof.evidence.kind.as_str())
        .bind(proof.submitted_at)
        .execute(pool)
        .await?;
    }

    if let Some(dispute) = &record.dispute {
        sqlx::query(
            "INSERT INTO wager_disputes (dispute_id, wager_id, disputer, reason, moderator,
                                         resolution, resolved_by, opened_at, resolved_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (dispute_id) DO UPDATE SET
                moderator = EXCLUDED.moderator,
                resolution = EXCLUDED.resolution,
                resolved_by = EXCLUDED.resolved_by,
                resolved_at = EXCLUDED.resolved_at",
        )
        .bind(dispute.id.as_uuid())
        .bind(dispute.wager_id.as_uuid())
        .bind(dispute.disputer.as_uuid())
        .bind(&dispute.reason)
        .bind(dispute.moderator.as_ref().map(|u| *u.as_uuid()))
        .bind(dispute.resolution.map(|r| r.as_str()))
        .bind(dispute.resolved_by.as_ref().map(|u| *u.as_uuid()))
        .bind(dispute.opened_at)
        .bind(dispute.resolved_at)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Load every wager record for hydration on boot.
pub async fn load_all_wager_records(pool: &PgPool) -> Result<Vec<WagerRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, WagerRow>(
        "SELECT wager_id, creator, acceptor, target_user, winner, game, description,
                stake_amount, payout_amount, platform_fee, state, created_at, accepted_at,
                started_at, result_submitted_at, completed_at, expires_at, transition_log
         FROM wagers ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let wager_id = row.wager_id;
        let acceptance = load_acceptance(pool, wager_id).await?;
        let proofs = load_proofs(pool, wager_id).await?;
        let dispute = load_dispute(pool, wager_id).await?;
        records.push(WagerRecord {
            wager: row.into_wager()?,
            acceptance,
            proofs,
            dispute,
        });
    }
    Ok(records)
}

async fn load_acceptance(
    pool: &PgPool,
    wager_id: Uuid,
) -> Result<Option<Acceptance>, sqlx::Error> {
    let row = sqlx::query_as::<_, AcceptanceRow>(
        "SELECT wager_id, acceptor, accepted_at FROM wager_acceptances WHERE wager_id = $1",
    )
    .bind(wager_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| Acceptance {
        wager_id: WagerId::from_uuid(r.wager_id),
        acceptor: UserId::from_uuid(r.acceptor),
        accepted_at: r.accepted_at,
    }))
}

async fn load_proofs(pool: &PgPool, wager_id: Uuid) -> Result<Vec<Proof>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProofRow>(
        "SELECT proof_id, wager_id, submitter, claimed_winner, evidence_url, evidence_kind,
                submitted_at
         FROM wager_proofs WHERE wager_id = $1 ORDER BY submitted_at",
    )
    .bind(wager_id)
    .fetch_all(pool)
    .await?;

    let mut proofs = Vec::with_capacity(rows.len());
    for r in rows {
        proofs.push(Proof {
            id: ProofId::from_uuid(r.proof_id),
            wager_id: WagerId::from_uuid(r.wager_id),
            submitter: UserId::from_uuid(r.submitter),
            claimed_winner: UserId::from_uuid(r.claimed_winner),
            evidence: Evidence {
                url: r.evidence_url,
                kind: parse_evidence_kind(&r.evidence_kind)?,
            },
            submitted_at: r.submitted_at,
        });
    }
    Ok(proofs)
}

async fn load_dispute(pool: &PgPool, wager_id: Uuid) -> Result<Option<Dispute>, sqlx::Error> {
    let row = sqlx::query_as::<_, DisputeRow>(
        "SELECT dispute_id, wager_id, disputer, reason, moderator, resolution, resolved_by,
                opened_at, resolved_at
         FROM wager_disputes WHERE wager_id = $1",
    )
    .bind(wager_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| {
        Ok(Dispute {
            id: DisputeId::from_uuid(r.dispute_id),
            wager_id: WagerId::from_uuid(r.wager_id),
            disputer: UserId::from_uuid(r.disputer),
            reason: r.reason,
            moderator: r.moderator.map(UserId::from_uuid),
            resolution: r.resolution.as_deref().map(parse_resolution).transpose()?,
            resolved_by: r.resolved_by.map(UserId::from_uuid),
            opened_at: r.opened_at,
            resolved_at: r.resolved_at,
        })
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct WagerRow {
    wager_id: Uuid,
    creator: Uuid,
    acceptor: Option<Uuid>,
    target_user: Option<Uuid>,
    winner: Option<Uuid>,
    game: String,
    description: String,
    stake_amount: i64,
    payout_amount: Option<i64>,
    platform_fee: Option<i64>,
    state: String,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    result_submitted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    transition_log: serde_json::Value,
}

impl WagerRow {
    fn into_wager(self) -> Result<Wager, sqlx::Error> {
        let transition_log = serde_json::from_value(self.transition_log).map_err(|e| {
            sqlx::Error::Protocol(format!(
                "corrupt transition log in wager {}: {e}",
                self.wager_id
            ))
        })?;
        Ok(Wager {
            id: WagerId::from_uuid(self.wager_id),
            creator: UserId::from_uuid(self.creator),
            acceptor: self.acceptor.map(UserId::from_uuid),
            target_user: self.target_user.map(UserId::from_uuid),
            winner: self.winner.map(UserId::from_uuid),
            game: self.game,
            description: self.description,
            stake_amount: amount_from_db(self.stake_amount)?,
            payout_amount: self.payout_amount.map(amount_from_db).transpose()?,
            platform_fee: self.platform_fee.map(amount_from_db).transpose()?,
            state: parse_state(&self.state)?,
            created_at: self.created_at,
            accepted_at: self.accepted_at,
            started_at: self.started_at,
            result_submitted_at: self.result_submitted_at,
            completed_at: self.completed_at,
            expires_at: self.expires_at,
            transition_log,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AcceptanceRow {
    wager_id: Uuid,
    acceptor: Uuid,
    accepted_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ProofRow {
    proof_id: Uuid,
    wager_id: Uuid,
    submitter: Uuid,
    claimed_winner: Uuid,
    evidence_url: String,
    evidence_kind: String,
    submitted_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct DisputeRow {
    dispute_id: Uuid,
    wager_id: Uuid,
    disputer: Uuid,
    reason: String,
    moderator: Option<Uuid>,
    resolution: Option<String>,
    resolved_by: Option<Uuid>,
    opened_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

fn amount_to_db(amount: Amount) -> Result<i64, sqlx::Error> {
    i64::try_from(amount.minor())
        .map_err(|_| sqlx::Error::Protocol(format!("amount {amount} exceeds BIGINT range")))
}

fn amount_from_db(value: i64) -> Result<Amount, sqlx::Error> {
    u64::try_from(value)
        .map(Amount::from_minor)
        .map_err(|_| sqlx::Error::Protocol(format!("negative amount {value} in database")))
}

fn parse_state(value: &str) -> Result<WagerState, sqlx::Error> {
    match value {
        "OPEN" => Ok(WagerState::Open),
        "ACCEPTED" => Ok(WagerState::Accepted),
        "IN_PROGRESS" => Ok(WagerState::InProgress),
        "PENDING_RESULT" => Ok(WagerState::PendingResult),
        "DISPUTED" => Ok(WagerState::Disputed),
        "COMPLETED" => Ok(WagerState::Completed),
        "EXPIRED" => Ok(WagerState::Expired),
        "CANCELLED" => Ok(WagerState::Cancelled),
        other => Err(sqlx::Error::Protocol(format!(
            "unknown wager state in database: '{other}'"
        ))),
    }
}

fn parse_resolution(value: &str) -> Result<DisputeResolution, sqlx::Error> {
    match value {
        "confirm_original" => Ok(DisputeResolution::ConfirmOriginal),
        "reverse" => Ok(DisputeResolution::Reverse),
        "void" => Ok(DisputeResolution::Void),
        other => Err(sqlx::Error::Protocol(format!(
            "unknown dispute resolution in database: '{other}'"
        ))),
    }
}

fn parse_evidence_kind(value: &str) -> Result<EvidenceKind, sqlx::Error> {
    match value {
        "screenshot" => Ok(EvidenceKind::Screenshot),
        "video" => Ok(EvidenceKind::Video),
        "match_log" => Ok(EvidenceKind::MatchLog),
        "other" => Ok(EvidenceKind::Other),
        unknown => Err(sqlx::Error::Protocol(format!(
            "unknown evidence kind in database: '{unknown}'"
        ))),
    }
}
