//! Chat endpoints

use crate::api::ExtractSession;
use crate::api::chat::schemas::{CreateMessage, Reply, Welcome};
use crate::core::traits::ChatService;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;

const WELCOME_MESSAGE: &str = "こんにちは！クレジットカードユーザー分析チャットボットへようこそ。以下のような質問をどうぞ。
・ここ半年間の購入額の合計を参考にしてユーザを高額利用者、中額利用者、少額利用者の３カテゴリにわけてそれぞれのカテゴリの人数を出してほしい。退会済みユーザは除外すること。
・ここ3ヶ月間で美容カテゴリで1000円以上の購入履歴が一度でもある人数を出してほしい。退会済みユーザは除外すること。
・ペットカテゴリユーザを、アクティブと休眠とでそれぞれ人数出して欲しい。退会済みユーザは当然除外すること。
・ここ半年間の解約者数の推移を数値で教えて
・ここ半年間のアクティブ者数の推移を数値で教えて
・ここ半年間のアクティブ者の月別平均購入額の推移を数値で教えて";

pub fn router() -> Router {
    Router::new()
        .route("/welcome", get(welcome))
        .route("/messages", post(post_message))
}

async fn welcome() -> (StatusCode, Json<Welcome>) {
    (
        StatusCode::OK,
        Json(Welcome {
            message: WELCOME_MESSAGE.to_owned(),
        }),
    )
}

async fn post_message(
    Inject(chat_service): Inject<dyn ChatService>,
    ExtractSession(session_id): ExtractSession,
    Json(message): Json<CreateMessage>,
) -> (StatusCode, Json<Reply>) {
    let reply = chat_service.process_turn(session_id, &message.text).await;

    (StatusCode::OK, Json(Reply::from(reply)))
}

pub mod schemas {
    use crate::core::traits::TurnReply;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    pub struct CreateMessage {
        pub text: String,
    }

    #[derive(Serialize, Debug)]
    pub struct Welcome {
        pub message: String,
    }

    #[derive(Serialize, Debug)]
    pub struct Reply {
        pub answer: String,
        pub sql: Option<String>,
        /// Base64-encoded PNG, when the result was charted.
        pub chart: Option<String>,
    }

    impl From<TurnReply> for Reply {
        fn from(reply: TurnReply) -> Self {
            Reply {
                answer: reply.answer,
                sql: reply.sql,
                chart: reply.chart_png.map(|png| STANDARD.encode(png)),
            }
        }
    }
}
