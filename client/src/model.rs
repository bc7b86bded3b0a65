//! Wire types of the Meeplo REST API.
//!
//! Field names follow the server's camelCase JSON. Optional or
//! server-populated fields default when absent so older servers still decode.

use serde::{Deserialize, Serialize};

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
}

/// A saved departure point of the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLocation {
    /// Server id
    pub id: u64,
    /// Label chosen by the user
    pub name: String,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Street address
    #[serde(default)]
    pub address: String,
}

/// The signed-in member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// Member id
    pub id: u64,
    /// Display name
    pub nickname: String,
    /// Profile photo URL
    #[serde(default)]
    pub profile_photo: Option<String>,
    /// Saved departure points
    #[serde(default)]
    pub start_locations: Vec<StartLocation>,
}

/// Profile edit form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    /// New display name
    pub nickname: String,
    /// New profile photo URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}

/// New departure point form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLocationForm {
    /// Label
    pub name: String,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Street address
    pub address: String,
}

/// A group member as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member id
    pub id: u64,
    /// Display name
    pub nickname: String,
    /// Profile photo URL
    #[serde(default)]
    pub profile_photo: Option<String>,
}

/// A place attached to a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// Location id
    pub id: u64,
    /// Name
    pub name: String,
    /// Latitude
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude
    #[serde(default)]
    pub lng: Option<f64>,
}

/// Group reference embedded in other payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    /// Group id
    pub id: u64,
    /// Group name
    pub name: String,
}

/// A meetup with its full detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Schedule id
    pub id: u64,
    /// Title
    pub name: String,
    /// Meetup date and time as sent by the server
    pub date: String,
    /// Free-form keywords
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Where members meet
    #[serde(default)]
    pub meet_location: Option<Place>,
    /// Where the group goes afterwards
    #[serde(default)]
    pub amuse_location: Vec<Place>,
    /// Invited members
    #[serde(default)]
    pub members: Vec<Member>,
    /// Owning group
    #[serde(default)]
    pub group: Option<GroupRef>,
}

/// A meetup as shown in a group's schedule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    /// Schedule id
    pub id: u64,
    /// Title
    pub name: String,
    /// Meetup date and time as sent by the server
    #[serde(default)]
    pub date: Option<String>,
}

/// Id-only reference used in forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    /// Referenced id
    pub id: u64,
}

/// Full schedule edit form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleForm {
    /// Schedule id
    pub id: u64,
    /// Meetup date and time
    pub date: String,
    /// Title
    pub name: String,
    /// Owning group
    pub group_id: u64,
    /// Free-form keywords
    pub keywords: Vec<String>,
    /// Where members meet
    pub meet_location_id: Option<u64>,
    /// Invited members
    pub members: Vec<IdRef>,
    /// Places visited afterwards
    pub amuses: Vec<IdRef>,
}

/// Minimal schedule created while recording a moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleScheduleForm {
    /// Owning group
    pub group_id: u64,
    /// Title
    pub name: String,
    /// Meetup date and time
    pub date: String,
}

/// A group with its detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Group id
    pub id: u64,
    /// Name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Cover photo URL
    #[serde(default)]
    pub group_photo: Option<String>,
    /// Members
    #[serde(default)]
    pub members: Vec<Member>,
}

/// A group as shown in the group list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    /// Group id
    pub id: u64,
    /// Name
    pub name: String,
    /// Cover photo URL
    #[serde(default)]
    pub group_photo: Option<String>,
    /// Number of members
    #[serde(default)]
    pub member_count: u32,
}

/// A subway station, searched or recommended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Location id
    #[serde(default)]
    pub id: Option<u64>,
    /// Station name
    pub name: String,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Travel time from each departure point, in minutes
    #[serde(default)]
    pub required_times: Vec<u32>,
}

/// Request body of the middle-point recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddlePointRequest {
    /// Departure points of every participant
    pub start_locations: Vec<Coordinate>,
}

/// A location with its detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDetail {
    /// Location id
    pub id: u64,
    /// Name
    pub name: String,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Street address
    #[serde(default)]
    pub address: Option<String>,
    /// Category label
    #[serde(default)]
    pub category: Option<String>,
    /// Contact number
    #[serde(default)]
    pub phone: Option<String>,
}

/// A shared memory recorded by a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moment {
    /// Moment id
    pub id: u64,
    /// Photo URL
    pub photo_url: String,
    /// Number of reactions
    #[serde(default)]
    pub reaction_count: u32,
    /// Schedule the moment belongs to
    #[serde(default)]
    pub schedule_id: Option<u64>,
}

/// Decoded body of any catalogued endpoint.
///
/// Every resource in the store holds a `Payload`; each endpoint decodes into
/// exactly one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// A mutation the server acknowledged
    Ack,
    /// The signed-in member
    User(UserInfo),
    /// One schedule
    Schedule(Schedule),
    /// A group's schedules
    Schedules(Vec<ScheduleSummary>),
    /// One group
    Group(Group),
    /// The user's groups
    Groups(Vec<GroupSummary>),
    /// Members of a group
    Members(Vec<Member>),
    /// Searched or recommended stations
    Stations(Vec<Station>),
    /// One location
    Location(LocationDetail),
    /// Moments of a group
    Moments(Vec<Moment>),
}

impl Payload {
    /// The member, if this is a user payload.
    #[must_use]
    pub const fn as_user(&self) -> Option<&UserInfo> {
        match self {
            Self::User(user) => Some(user),
            _ => None,
        }
    }

    /// The stations, if this is a station payload.
    #[must_use]
    pub fn as_stations(&self) -> Option<&[Station]> {
        match self {
            Self::Stations(stations) => Some(stations),
            _ => None,
        }
    }

    /// The schedule, if this is a schedule payload.
    #[must_use]
    pub const fn as_schedule(&self) -> Option<&Schedule> {
        match self {
            Self::Schedule(schedule) => Some(schedule),
            _ => None,
        }
    }
}

macro_rules! payload_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Payload {
                fn from(value: $source) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

payload_from! {
    UserInfo => User,
    Schedule => Schedule,
    Vec<ScheduleSummary> => Schedules,
    Group => Group,
    Vec<GroupSummary> => Groups,
    Vec<Member> => Members,
    Vec<Station> => Stations,
    LocationDetail => Location,
    Vec<Moment> => Moments,
}
