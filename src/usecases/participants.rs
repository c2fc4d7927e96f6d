use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::models::participants::{Account, Participant, ParticipantId, ParticipantProfile};
use hashbrown::HashMap;

pub async fn authenticate<C: Context>(ctx: &C, token: &str) -> ServiceResult<Participant> {
    if token.trim().is_empty() {
        return Err(AppError::Unauthenticated);
    }
    match ctx.participants().fetch_session(token).await {
        Ok(Some(session)) => Participant::try_from(session),
        Ok(None) => Err(AppError::Unauthenticated),
        Err(e) => unexpected(e),
    }
}

pub async fn fetch_admin<C: Context>(ctx: &C) -> ServiceResult<Account> {
    match ctx.participants().fetch_admin().await {
        Ok(Some(admin)) => Account::try_from(admin),
        Ok(None) => Err(AppError::UsersAdminNotFound),
        Err(e) => unexpected(e),
    }
}

pub async fn fetch_one<C: Context>(ctx: &C, participant_id: &ParticipantId) -> ServiceResult<Account> {
    match ctx.participants().fetch_one(participant_id.as_str()).await {
        Ok(Some(account)) => Account::try_from(account),
        Ok(None) => Err(AppError::UsersNotFound),
        Err(e) => unexpected(e),
    }
}

/// Resolves display profiles for a set of ids. Ids that no longer resolve are left out.
pub async fn fetch_profiles<C: Context>(
    ctx: &C,
    participant_ids: Vec<ParticipantId>,
) -> ServiceResult<HashMap<ParticipantId, ParticipantProfile>> {
    let mut profiles = HashMap::new();
    for participant_id in participant_ids {
        if profiles.contains_key(&participant_id) {
            continue;
        }
        match fetch_one(ctx, &participant_id).await {
            Ok(account) => {
                profiles.insert(participant_id, account.profile);
            }
            Err(AppError::UsersNotFound) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(profiles)
}
