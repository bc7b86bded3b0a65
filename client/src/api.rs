//! Endpoint catalogue.
//!
//! Each function returns the [`AsyncAction`] for one REST operation, bound
//! to the resource key its outcome is stored under. Queries and the
//! mutations that follow them use separate keys so acknowledging a mutation
//! never replaces the data a screen is showing.

use crate::action::{AsyncAction, ack, json};
use crate::model::{
    Group, GroupSummary, LocationDetail, Member, MiddlePointRequest, Moment, Payload, ProfileForm,
    Schedule, ScheduleForm, ScheduleSummary, SimpleScheduleForm, StartLocationForm, Station, UserInfo,
};
use meeplo_core::resource::{OrderingPolicy, RemoteResource, ResourceMap, StalePolicy};
use meeplo_core::transport::Request;
use serde::Serialize;

/// Resource keys shared by the store and the actions.
pub mod keys {
    /// The signed-in member
    pub const USER: &str = "user";
    /// Profile edits and account deletion
    pub const USER_PROFILE: &str = "user.profile";
    /// Departure point edits
    pub const USER_LOCATION: &str = "user.location";
    /// Schedule detail
    pub const SCHEDULE: &str = "schedule";
    /// Schedule edits
    pub const SCHEDULE_EDIT: &str = "schedule.edit";
    /// A group's schedules
    pub const SCHEDULE_LIST: &str = "schedule.list";
    /// Simple schedule creation
    pub const SCHEDULE_CREATE: &str = "schedule.create";
    /// Group detail
    pub const GROUP: &str = "group";
    /// The user's groups
    pub const GROUP_LIST: &str = "group.list";
    /// Members of a group
    pub const GROUP_MEMBERS: &str = "group.members";
    /// Middle-point station recommendation
    pub const RECOMMENDATION: &str = "recommendation";
    /// Station search
    pub const LOCATION: &str = "location";
    /// Location detail
    pub const LOCATION_DETAIL: &str = "location.detail";
    /// Moments of a group
    pub const MEMORY: &str = "memory";

    /// Every catalogued key.
    pub const ALL: [&str; 14] = [
        USER,
        USER_PROFILE,
        USER_LOCATION,
        SCHEDULE,
        SCHEDULE_EDIT,
        SCHEDULE_LIST,
        SCHEDULE_CREATE,
        GROUP,
        GROUP_LIST,
        GROUP_MEMBERS,
        RECOMMENDATION,
        LOCATION,
        LOCATION_DETAIL,
        MEMORY,
    ];
}

/// Every catalogued resource, idle, with its declared policies.
///
/// Screens that refresh in place (the member, lists) keep serving their last
/// payload while a refresh is pending. Detail, search and mutation resources
/// clear on start. Every resource applies the seq guard.
#[must_use]
pub fn default_resources() -> ResourceMap<Payload> {
    keys::ALL.iter().fold(ResourceMap::new(), |map, key| {
        map.with_resource(*key, RemoteResource::new(stale_policy(key), OrderingPolicy::SeqGuard))
    })
}

fn stale_policy(key: &str) -> StalePolicy {
    match key {
        keys::USER | keys::SCHEDULE_LIST | keys::GROUP_LIST | keys::GROUP_MEMBERS | keys::MEMORY => {
            StalePolicy::RetainData
        },
        _ => StalePolicy::Clear,
    }
}

fn body<T: Serialize>(operation: &'static str, form: &T) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(form).inspect_err(|error| {
        tracing::error!(operation, error = %error, "Request body does not serialize");
    })
}

/// `GET /member`
#[must_use]
pub fn get_user_info() -> AsyncAction {
    AsyncAction::new(keys::USER, "get_user_info", Request::get("/member"), json::<UserInfo>)
}

/// `PUT /member`
///
/// # Errors
///
/// Returns the `serde_json` error when the form does not serialize.
pub fn edit_user_info(form: &ProfileForm) -> Result<AsyncAction, serde_json::Error> {
    Ok(AsyncAction::new(
        keys::USER_PROFILE,
        "edit_user_info",
        Request::put("/member").with_body(body("edit_user_info", form)?),
        ack,
    ))
}

/// `DELETE /member`
#[must_use]
pub fn delete_user() -> AsyncAction {
    AsyncAction::new(keys::USER_PROFILE, "delete_user", Request::delete("/member"), ack)
}

/// `POST /member/location`
///
/// # Errors
///
/// Returns the `serde_json` error when the form does not serialize.
pub fn create_start_location(form: &StartLocationForm) -> Result<AsyncAction, serde_json::Error> {
    Ok(AsyncAction::new(
        keys::USER_LOCATION,
        "create_start_location",
        Request::post("/member/location").with_body(body("create_start_location", form)?),
        ack,
    ))
}

/// `DELETE /member/location/{id}`
#[must_use]
pub fn delete_start_location(location_id: u64) -> AsyncAction {
    AsyncAction::new(
        keys::USER_LOCATION,
        "delete_start_location",
        Request::delete(format!("/member/location/{location_id}")),
        ack,
    )
}

/// `GET /schedule/{id}`
#[must_use]
pub fn get_schedule(schedule_id: u64) -> AsyncAction {
    AsyncAction::new(
        keys::SCHEDULE,
        "get_schedule",
        Request::get(format!("/schedule/{schedule_id}")),
        json::<Schedule>,
    )
}

/// `PUT /schedule/{id}`
///
/// # Errors
///
/// Returns the `serde_json` error when the form does not serialize.
pub fn edit_schedule(form: &ScheduleForm) -> Result<AsyncAction, serde_json::Error> {
    Ok(AsyncAction::new(
        keys::SCHEDULE_EDIT,
        "edit_schedule",
        Request::put(format!("/schedule/{}", form.id)).with_body(body("edit_schedule", form)?),
        ack,
    ))
}

/// `GET /group/{id}/schedule`
#[must_use]
pub fn get_group_schedules(group_id: u64) -> AsyncAction {
    AsyncAction::new(
        keys::SCHEDULE_LIST,
        "get_group_schedules",
        Request::get(format!("/group/{group_id}/schedule")),
        json::<Vec<ScheduleSummary>>,
    )
}

/// `POST /schedule/simple`
///
/// # Errors
///
/// Returns the `serde_json` error when the form does not serialize.
pub fn create_simple_schedule(form: &SimpleScheduleForm) -> Result<AsyncAction, serde_json::Error> {
    Ok(AsyncAction::new(
        keys::SCHEDULE_CREATE,
        "create_simple_schedule",
        Request::post("/schedule/simple").with_body(body("create_simple_schedule", form)?),
        ack,
    ))
}

/// `GET /group/{id}`
#[must_use]
pub fn get_group(group_id: u64) -> AsyncAction {
    AsyncAction::new(
        keys::GROUP,
        "get_group",
        Request::get(format!("/group/{group_id}")),
        json::<Group>,
    )
}

/// `GET /group`
#[must_use]
pub fn get_group_list() -> AsyncAction {
    AsyncAction::new(
        keys::GROUP_LIST,
        "get_group_list",
        Request::get("/group"),
        json::<Vec<GroupSummary>>,
    )
}

/// `GET /group/{id}/member`
#[must_use]
pub fn get_group_members(group_id: u64) -> AsyncAction {
    AsyncAction::new(
        keys::GROUP_MEMBERS,
        "get_group_members",
        Request::get(format!("/group/{group_id}/member")),
        json::<Vec<Member>>,
    )
}

/// `POST /recommendation/middle`
///
/// # Errors
///
/// Returns the `serde_json` error when the form does not serialize.
pub fn get_middle_point(request: &MiddlePointRequest) -> Result<AsyncAction, serde_json::Error> {
    Ok(AsyncAction::new(
        keys::RECOMMENDATION,
        "get_middle_point",
        Request::post("/recommendation/middle").with_body(body("get_middle_point", request)?),
        json::<Vec<Station>>,
    ))
}

/// `GET /location/station?keyword=`
#[must_use]
pub fn get_station_list(keyword: &str) -> AsyncAction {
    AsyncAction::new(
        keys::LOCATION,
        "get_station_list",
        Request::get("/location/station").with_query("keyword", keyword),
        json::<Vec<Station>>,
    )
}

/// `GET /location/{id}`
#[must_use]
pub fn get_location_detail(location_id: u64) -> AsyncAction {
    AsyncAction::new(
        keys::LOCATION_DETAIL,
        "get_location_detail",
        Request::get(format!("/location/{location_id}")),
        json::<LocationDetail>,
    )
}

/// `GET /group/{id}/moment`
#[must_use]
pub fn get_group_moments(group_id: u64) -> AsyncAction {
    AsyncAction::new(
        keys::MEMORY,
        "get_group_moments",
        Request::get(format!("/group/{group_id}/moment")),
        json::<Vec<Moment>>,
    )
}
