//! User-visible strings
//!
//! The product ships in Vietnamese; keep every string the user can see here.

/// Substituted for the answer whenever the gateway fails
pub const ANSWER_FAILED: &str = "Vui lòng thử lại sau";

/// Substituted for the answer when there is no signed-in caller
pub const SIGN_IN_REQUIRED: &str = "Vui lòng đăng nhập để tiếp tục";

/// Alert shown when feedback is requested before any question was asked
pub const NO_QUESTION_FOR_FEEDBACK: &str = "Chưa có câu hỏi nào để phản hồi";

/// Confirmation asked before a conversation is deleted
pub const CONFIRM_DELETE: &str = "Bạn có chắc muốn xóa cuộc trò chuyện này?";

/// Alert shown when a delete did not go through
pub const DELETE_FAILED: &str = "Không thể xóa cuộc trò chuyện";

/// Alert shown when the transcript could not be saved
pub const SAVE_FAILED: &str = "Không thể lưu lịch sử trò chuyện";
