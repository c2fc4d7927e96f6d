use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult};
use crate::models::conversations::{
    ConversationAggregate, ConversationId, ConversationMessages, ConversationSummary, UnreadCount,
};
use crate::models::messages::{Attachment, MessageDraft, MessageOrigin, MessageResponse};
use crate::models::participants::{Participant, ParticipantId};
use crate::usecases::{messages, participants, realtime};
use tracing::{error, info, warn};

const ADMIN_WELCOME: &str =
    "Hello! An administrator has opened this conversation. Feel free to reply here.";
const USER_WELCOME: &str =
    "Welcome! Send us a message and an administrator will get back to you shortly.";

/// Resolves who `participant` is allowed to talk to.
///
/// Regular users always talk to the admin, admins must name the other party.
async fn resolve_counterpart<C: Context>(
    ctx: &C,
    participant: &Participant,
    other_id: Option<ParticipantId>,
) -> ServiceResult<ParticipantId> {
    if participant.is_admin() {
        let other_id = other_id
            .filter(|id| !id.is_blank())
            .ok_or(AppError::MessagesInvalid("A receiver is required."))?;
        let other = participants::fetch_one(ctx, &other_id).await?;
        return Ok(other.participant.id);
    }

    let admin = participants::fetch_admin(ctx).await?;
    match other_id {
        None => Ok(admin.participant.id),
        Some(other_id) if other_id == admin.participant.id => Ok(other_id),
        Some(other_id) => {
            // other admins are fine, other users are not
            let other = participants::fetch_one(ctx, &other_id).await?;
            if !other.participant.is_admin() {
                return Err(AppError::Forbidden);
            }
            Ok(other.participant.id)
        }
    }
}

pub async fn send_message<C: Context>(
    ctx: &C,
    sender: &Participant,
    receiver_id: Option<ParticipantId>,
    content: String,
    attachments: Vec<Attachment>,
) -> ServiceResult<MessageResponse> {
    let sender = match participants::fetch_one(ctx, &sender.id).await {
        Ok(account) => account.participant,
        Err(AppError::UsersNotFound) => return Err(AppError::Unauthenticated),
        Err(e) => return Err(e),
    };
    let receiver_id = resolve_counterpart(ctx, &sender, receiver_id).await?;
    let origin = if sender.is_admin() {
        MessageOrigin::AdminReply
    } else {
        MessageOrigin::UserMessage
    };

    let message = messages::append(
        ctx,
        MessageDraft {
            sender_id: Some(sender.id.clone()),
            receiver_id: Some(receiver_id),
            content,
            origin,
            conversation_id: None,
            interest_id: None,
            attachments,
        },
    )
    .await?;
    info!(
        message_id = message.message_id,
        conversation_id = %message.conversation_id,
        sender_id = %sender.id,
        origin = origin.as_str(),
        "Message sent"
    );

    let response = messages::present_one(ctx, message).await?;
    if let Err(e) = realtime::publish_message(ctx, response.clone()).await {
        warn!(
            conversation_id = %response.conversation_id,
            "Message stored but not pushed in realtime: {}",
            e.code()
        );
    }
    Ok(response)
}

/// Admin reply into an explicitly addressed conversation.
pub async fn reply<C: Context>(
    ctx: &C,
    admin: &Participant,
    conversation_id: ConversationId,
    receiver_id: ParticipantId,
    content: String,
    attachments: Vec<Attachment>,
) -> ServiceResult<MessageResponse> {
    if !admin.is_admin() {
        return Err(AppError::Forbidden);
    }
    if ConversationId::resolve(&admin.id, &receiver_id)? != conversation_id {
        return Err(AppError::MessagesInvalid(
            "The conversation does not belong to the message participants.",
        ));
    }
    send_message(ctx, admin, Some(receiver_id), content, attachments).await
}

/// Opens the conversation between `current` and `other_id`.
///
/// The first open persists a welcome message so that no conversation is ever
/// observed empty. Later opens return the stored history as is.
pub async fn get_or_create<C: Context>(
    ctx: &C,
    current: &Participant,
    other_id: Option<ParticipantId>,
) -> ServiceResult<ConversationMessages> {
    let other_id = resolve_counterpart(ctx, current, other_id).await?;
    let conversation_id = ConversationId::resolve(&current.id, &other_id)?;

    let content = if current.is_admin() {
        ADMIN_WELCOME
    } else {
        USER_WELCOME
    };
    let welcome = messages::append_first(
        ctx,
        MessageDraft {
            sender_id: Some(current.id.clone()),
            receiver_id: Some(other_id),
            content: content.to_owned(),
            origin: MessageOrigin::SystemMessage,
            conversation_id: Some(conversation_id.clone()),
            interest_id: None,
            attachments: vec![],
        },
    )
    .await?;
    if let Some(welcome) = welcome {
        info!(
            message_id = welcome.message_id,
            %conversation_id,
            "Created welcome message"
        );
    }

    let history = messages::fetch_by_conversation(ctx, &conversation_id).await?;
    Ok(ConversationMessages {
        messages: messages::present(ctx, history).await?,
        conversation_id,
    })
}

pub async fn get_conversations<C: Context>(
    ctx: &C,
    requester: &Participant,
) -> ServiceResult<Vec<ConversationSummary>> {
    if requester.is_admin() {
        return get_admin_conversations(ctx, requester).await;
    }

    let admin = participants::fetch_admin(ctx).await?;
    let conversation_id = ConversationId::resolve(&requester.id, &admin.participant.id)?;
    let last_message = match messages::fetch_latest(ctx, &conversation_id).await? {
        Some(message) => Some(messages::present_one(ctx, message).await?),
        None => None,
    };
    let unread_count = messages::count_unread(ctx, &conversation_id, &requester.id).await?;
    Ok(vec![ConversationSummary {
        conversation_id,
        participant: Some(admin.profile),
        last_message,
        unread_count,
    }])
}

async fn get_admin_conversations<C: Context>(
    ctx: &C,
    admin: &Participant,
) -> ServiceResult<Vec<ConversationSummary>> {
    let mut conversations = messages::list_conversations_for_admin(ctx, &admin.id).await?;
    conversations.sort_by(|a, b| {
        (b.last_message.created_at, b.last_message.message_id)
            .cmp(&(a.last_message.created_at, a.last_message.message_id))
    });

    let counterparts: Vec<Option<ParticipantId>> = conversations
        .iter()
        .map(|conversation| counterpart_of(conversation, &admin.id))
        .collect();
    let counterpart_ids: Vec<ParticipantId> = counterparts.iter().flatten().cloned().collect();
    let profiles = participants::fetch_profiles(ctx, counterpart_ids).await?;

    let mut summaries = Vec::with_capacity(conversations.len());
    for (conversation, counterpart) in conversations.into_iter().zip(counterparts) {
        let participant = counterpart.and_then(|id| profiles.get(&id).cloned());
        let last_message = messages::present_one(ctx, conversation.last_message).await?;
        summaries.push(ConversationSummary {
            conversation_id: conversation.conversation_id,
            participant,
            last_message: Some(last_message),
            unread_count: conversation.unread_count,
        });
    }
    Ok(summaries)
}

/// The party of a conversation the admin is talking to.
fn counterpart_of(
    conversation: &ConversationAggregate,
    admin_id: &ParticipantId,
) -> Option<ParticipantId> {
    let mut others: Vec<&ParticipantId> = conversation
        .participant_ids
        .iter()
        .filter(|id| *id != admin_id)
        .collect();
    others.sort();
    others.dedup();

    if others.len() > 1 {
        error!(
            conversation_id = %conversation.conversation_id,
            participants = others.len(),
            "Conversation has more than one counterpart"
        );
        let last = &conversation.last_message;
        let latest = [&last.sender_id, &last.receiver_id]
            .into_iter()
            .flatten()
            .find(|id| *id != admin_id);
        if let Some(latest) = latest {
            return Some(latest.clone());
        }
    }
    others.first().map(|id| (*id).clone())
}

/// Admins may access any conversation. Anyone else must appear in its stored
/// messages, or be asking for their own, still empty, conversation with the admin.
///
/// Membership is never read back out of the id, as ids may contain the separator.
pub async fn ensure_party<C: Context>(
    ctx: &C,
    participant: &Participant,
    conversation_id: &ConversationId,
) -> ServiceResult<()> {
    if participant.is_admin() {
        return Ok(());
    }
    if messages::is_party(ctx, conversation_id, &participant.id).await? {
        return Ok(());
    }
    if messages::fetch_latest(ctx, conversation_id).await?.is_some() {
        return Err(AppError::Forbidden);
    }
    let admin = match participants::fetch_admin(ctx).await {
        Ok(admin) => admin,
        Err(AppError::UsersAdminNotFound) => return Err(AppError::Forbidden),
        Err(e) => return Err(e),
    };
    if ConversationId::resolve(&participant.id, &admin.participant.id)? == *conversation_id {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

pub async fn get_messages<C: Context>(
    ctx: &C,
    requester: &Participant,
    conversation_id: ConversationId,
) -> ServiceResult<ConversationMessages> {
    ensure_party(ctx, requester, &conversation_id).await?;

    let updated = messages::mark_read(ctx, &conversation_id, &requester.id).await?;
    if updated > 0 {
        info!(
            %conversation_id,
            participant_id = %requester.id,
            updated,
            "Marked messages as read"
        );
    }

    let history = messages::fetch_by_conversation(ctx, &conversation_id).await?;
    if history.is_empty() {
        return Err(AppError::ConversationsNotFound);
    }
    Ok(ConversationMessages {
        messages: messages::present(ctx, history).await?,
        conversation_id,
    })
}

pub async fn unread_count<C: Context>(
    ctx: &C,
    requester: &Participant,
    conversation_id: ConversationId,
) -> ServiceResult<UnreadCount> {
    ensure_party(ctx, requester, &conversation_id).await?;
    let unread_count = messages::count_unread(ctx, &conversation_id, &requester.id).await?;
    Ok(UnreadCount {
        conversation_id,
        unread_count,
    })
}
