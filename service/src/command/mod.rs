//! [`Command`] definition.

pub mod accept_reply;
pub mod approve_order;
pub mod change_order_status;
pub mod create_order;
pub mod drop_replies;
pub mod drop_reply;
pub mod mark_reply_paid;
pub mod submit_reply;
pub mod take_order;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    accept_reply::AcceptReply, approve_order::ApproveOrder,
    change_order_status::ChangeOrderStatus, create_order::CreateOrder,
    drop_replies::DropReplies, drop_reply::DropReply,
    mark_reply_paid::MarkReplyPaid, submit_reply::SubmitReply,
    take_order::TakeOrder,
};
