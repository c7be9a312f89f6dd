pub mod attributes;
pub mod group_members;
pub mod groups;
pub mod layer_keywords;
pub mod layer_styles;
pub mod layers;
pub mod object_permissions;
pub mod ratings;
pub mod styles;
pub mod topic_categories;
pub mod user_sessions;
pub mod users;
