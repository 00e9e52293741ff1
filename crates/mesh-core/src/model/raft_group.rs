use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    Mcg,
    Dsg,
}

pub type GroupId = String;

/// Metadata describing one Raft group, independent of its log contents
/// (mesh-consensus owns the log/term/role machinery; this is the
/// identity and membership record mesh-core's ports persist).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaftGroupMeta {
    pub group_id: GroupId,
    pub group_type: GroupType,
    pub members: Vec<String>,
}

impl RaftGroupMeta {
    pub fn mcg(group_id: impl Into<GroupId>, members: Vec<String>) -> Self {
        RaftGroupMeta {
            group_id: group_id.into(),
            group_type: GroupType::Mcg,
            members,
        }
    }

    pub fn dsg(group_id: impl Into<GroupId>, src: impl Into<String>, dst_set: Vec<String>) -> Self {
        let mut members = vec![src.into()];
        members.extend(dst_set);
        RaftGroupMeta {
            group_id: group_id.into(),
            group_type: GroupType::Dsg,
            members,
        }
    }
}
