pub mod shared {
    pub mod configuration_error;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod video_metadata;
}

pub mod video {
    pub mod domain {
        pub mod frame_sampler;
        pub mod image_writer;
        pub mod video_reader;
    }
    pub mod infrastructure {
        pub mod ffmpeg_reader;
        pub mod image_file_writer;
    }
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod text_detector;
    }
    pub mod infrastructure;
}

pub mod scoring {
    pub mod domain {
        pub mod beauty_scorer;
        pub mod content_gate;
        pub mod face_signal;
        pub mod feature_metrics;
    }
}

pub mod selection {
    pub mod domain {
        pub mod bounded_top_k_selector;
        pub mod buffered_top_k_selector;
        pub mod frame_selector;
        pub mod scored_frame;
    }
}

pub mod pipeline {
    pub mod extract_wallpapers_use_case;
    pub mod pipeline_error;
    pub mod pipeline_executor;
    pub mod pipeline_logger;
    pub mod wallpaper_saver;
    pub mod infrastructure {
        pub mod sequential_pipeline_executor;
        pub mod threaded_pipeline_executor;
    }
}
