use std::path::PathBuf;
use std::time::{Duration, Instant};

use iced::widget::{column, container, image, row, scrollable, text, tooltip, Space};
use iced::{Color, Element, Length, Subscription, Task, Theme};

use crate::config::{self, Settings};
use crate::photo::Photo;
use crate::scanner;

const THUMB_FADE_MS: f32 = 300.0;
const THUMB_SIZE: f32 = 200.0;
const THUMB_CELL: f32 = THUMB_SIZE + 8.0; // image + spacing
const GRID_PADDING: f32 = 10.0;
const LABEL_COLOR: Color = Color::from_rgb(0.5, 0.5, 0.55);

fn boot() -> (Gallery, Task<Message>) {
    let mut state = Gallery::new(config::gallery_dir(), config::load());
    log::info!("Scanning {}", state.scan_dir.display());
    let task = start_loading(&mut state);
    (state, task)
}

pub fn run() -> iced::Result {
    iced::application(boot, update, view)
        .title("Photo Manager")
        .theme(theme)
        .subscription(subscription)
        .centered()
        .run()
}

/// A photo as shown in the grid: the model plus its decoded thumbnail handle.
struct GalleryItem {
    photo: Photo,
    thumbnail: Option<image::Handle>,
}

impl GalleryItem {
    fn new(photo: Photo) -> Self {
        let thumbnail = photo.thumbnail_path.clone().map(image::Handle::from_path);
        Self { photo, thumbnail }
    }
}

struct Gallery {
    scan_dir: PathBuf,
    settings: Settings,
    items: Vec<GalleryItem>,
    loading: bool,
    error: Option<String>,
    loaded_at: Option<Instant>,
}

impl Gallery {
    fn new(scan_dir: PathBuf, settings: Settings) -> Self {
        Self {
            scan_dir,
            settings,
            items: Vec::new(),
            loading: false,
            error: None,
            loaded_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    PhotosLoaded(Result<Vec<Photo>, String>),
    Tick,
}

fn start_loading(state: &mut Gallery) -> Task<Message> {
    state.items.clear();
    state.error = None;
    state.loading = true;
    Task::perform(
        load_gallery(state.scan_dir.clone(), state.settings.clone()),
        Message::PhotosLoaded,
    )
}

async fn load_gallery(dir: PathBuf, settings: Settings) -> Result<Vec<Photo>, String> {
    scanner::load_photos(&dir, &settings).map_err(|e| e.to_string())
}

fn subscription(state: &Gallery) -> Subscription<Message> {
    if thumbnails_fading(state) {
        iced::time::every(Duration::from_millis(16)).map(|_| Message::Tick)
    } else {
        Subscription::none()
    }
}

fn thumbnails_fading(state: &Gallery) -> bool {
    state
        .loaded_at
        .is_some_and(|t| t.elapsed().as_secs_f32() * 1000.0 < THUMB_FADE_MS)
}

fn update(state: &mut Gallery, message: Message) -> Task<Message> {
    match message {
        Message::PhotosLoaded(Ok(photos)) => {
            state.items = photos.into_iter().map(GalleryItem::new).collect();
            state.loaded_at = Some(Instant::now());
            state.loading = false;
        }
        Message::PhotosLoaded(Err(e)) => {
            log::error!("An error occurred while loading photos: {}", e);
            state.error = Some(e);
            state.loading = false;
        }
        // Redraw only; opacity is derived from `loaded_at`.
        Message::Tick => {}
    }
    Task::none()
}

fn view(state: &Gallery) -> Element<'_, Message> {
    let mut toolbar_items: Vec<Element<'_, Message>> =
        vec![text("Photo Manager").size(16).into()];

    if !state.loading && !state.items.is_empty() {
        toolbar_items.push(
            text(format!("{} photos", state.items.len()))
                .size(13)
                .color(LABEL_COLOR)
                .into(),
        );
    }
    toolbar_items.push(Space::new().width(Length::Fill).into());
    toolbar_items.push(text(state.scan_dir.display().to_string()).size(14).into());

    let toolbar = row(toolbar_items).spacing(10).padding(10);

    let mut layout = column![toolbar];
    if let Some(error) = &state.error {
        layout = layout.push(
            container(text(format!("Failed to load photos: {}", error)).color(Color::WHITE))
                .width(Length::Fill)
                .padding(10)
                .style(error_banner_style),
        );
    }

    let content: Element<'_, Message> = if state.loading {
        container(text("Loading photos...")).center(Length::Fill).into()
    } else if state.items.is_empty() {
        container(text(format!(
            "No photos found in {}",
            state.scan_dir.display()
        )))
        .center(Length::Fill)
        .into()
    } else {
        scrollable(thumbnail_grid(state)).height(Length::Fill).into()
    };

    container(layout.push(content)).into()
}

fn thumbnail_grid(state: &Gallery) -> Element<'_, Message> {
    let items = &state.items;
    let opacity = state
        .loaded_at
        .map(|t| (t.elapsed().as_secs_f32() * 1000.0 / THUMB_FADE_MS).min(1.0))
        .unwrap_or(1.0);

    iced::widget::responsive(move |size| {
        let available = size.width - GRID_PADDING * 2.0;
        let per_row = ((available + 8.0) / THUMB_CELL).max(1.0) as usize;

        let rows: Vec<Element<Message>> = items
            .chunks(per_row)
            .map(|chunk| {
                let cells: Vec<Element<Message>> = chunk
                    .iter()
                    .map(|item| thumbnail_cell(item, opacity))
                    .collect();
                row(cells).spacing(8).into()
            })
            .collect();

        column(rows).spacing(12).padding(GRID_PADDING).into()
    })
    .into()
}

fn thumbnail_cell(item: &GalleryItem, opacity: f32) -> Element<'_, Message> {
    let preview: Element<'_, Message> = match &item.thumbnail {
        Some(handle) => image(handle.clone())
            .width(THUMB_SIZE)
            .height(THUMB_SIZE)
            .content_fit(iced::ContentFit::Contain)
            .opacity(opacity)
            .into(),
        None => container(text("No preview").size(11).color(LABEL_COLOR))
            .center(THUMB_SIZE)
            .style(container::bordered_box)
            .into(),
    };

    let preview = tooltip(
        preview,
        container(text(item.photo.path.display().to_string()).size(11))
            .padding(6)
            .style(container::rounded_box),
        tooltip::Position::FollowCursor,
    );

    column![
        preview,
        text(item.photo.file_name.as_str()).size(11),
        text(item.photo.created_label()).size(10).color(LABEL_COLOR),
    ]
    .spacing(2)
    .width(THUMB_SIZE)
    .into()
}

fn error_banner_style(theme: &Theme) -> container::Style {
    let palette = theme.palette();
    container::Style {
        background: Some(iced::Background::Color(palette.danger)),
        border: iced::Border {
            radius: 4.0.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn theme(_state: &Gallery) -> Theme {
    Theme::Dark
}
