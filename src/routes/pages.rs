use axum::response::Html;

pub async fn home() -> Html<&'static str> {
    Html(include_str!("../../templates/home.html"))
}

pub async fn upload() -> Html<&'static str> {
    Html(include_str!("../../templates/predict.html"))
}
