use crate::common::context::Context;
use crate::common::error::ServiceResult;
use crate::common::redis_json::Json;
use crate::models::interests::InterestSubmitted;
use crate::usecases::interests;
use redis::Msg;
use tracing::info;

pub async fn handle<C: Context>(ctx: &C, msg: Msg) -> ServiceResult<()> {
    let event: Json<InterestSubmitted> = msg.get_payload()?;
    let event = event.into_inner();
    info!(
        interest_id = event.interest_id,
        submitter_id = %event.submitter_id,
        "Handling interest submitted event"
    );
    interests::on_submitted(ctx, event);
    Ok(())
}
