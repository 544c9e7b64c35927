use std::fs;
use std::path::Path;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::UploadConfig;
use crate::models::error::CaptureError;
use crate::traits::uploader::Uploader;

pub const SUCCESS_MESSAGE: &str = "Uploaded successfully!";

/// Multipart HTTP uploader.
///
/// Posts the file as form field `data` (`audio/wav`) with the credential in
/// `x-api-key` and the label in `x-label`. Only HTTP 200 counts as success.
pub struct HttpUploader {
    config: UploadConfig,
    client: Client,
}

impl HttpUploader {
    pub fn new(config: UploadConfig) -> Result<Self, CaptureError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CaptureError::UploadFailure(format!("failed to build http client: {}", e)))?;
        Ok(Self { config, client })
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, file_path: &Path, label: &str, credential: &str) -> Result<String, CaptureError> {
        validate_request(file_path, label)?;

        let bytes = fs::read(file_path)
            .map_err(|e| CaptureError::IoFailure(format!("failed to read {}: {}", file_path.display(), e)))?;
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        log::info!(
            "Uploading {} ({} bytes, label {:?}) to {}",
            file_name,
            bytes.len(),
            label,
            self.config.endpoint
        );

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| CaptureError::UploadFailure(e.to_string()))?;
        let form = Form::new().part("data", part);

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", credential)
            .header("x-label", label)
            .multipart(form)
            .send()
            .map_err(|e| CaptureError::UploadFailure(e.to_string()))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        interpret_response(status, &body)
    }
}

fn validate_request(file_path: &Path, label: &str) -> Result<(), CaptureError> {
    if label.trim().is_empty() {
        return Err(CaptureError::InvalidParameter("label cannot be empty".into()));
    }
    if !file_path.is_file() {
        return Err(CaptureError::IoFailure(format!(
            "no recording at {}",
            file_path.display()
        )));
    }
    Ok(())
}

fn interpret_response(status: StatusCode, body: &str) -> Result<String, CaptureError> {
    if status == StatusCode::OK {
        return Ok(SUCCESS_MESSAGE.to_string());
    }
    log::warn!("Upload rejected with status {}", status.as_u16());
    Err(CaptureError::UploadFailure(format!(
        "failed with status code: {}, response: {}",
        status.as_u16(),
        body
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Duration;

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("chain_capture_upload_{}_{}", uuid::Uuid::new_v4(), name))
    }

    /// Accept one request, hand back its raw text, and answer with `status` / `body`.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/training/files", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).unwrap_or(0);
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            });
        match content_length {
            Some(len) => request.len() >= header_end + 4 + len,
            None => text.ends_with("--\r\n") || text.ends_with("0\r\n\r\n"),
        }
    }

    fn uploader_for(url: String) -> HttpUploader {
        HttpUploader::new(UploadConfig {
            endpoint: url,
            timeout: Duration::from_secs(10),
        })
        .unwrap()
    }

    #[test]
    fn ok_status_is_success() {
        assert_eq!(interpret_response(StatusCode::OK, "").unwrap(), SUCCESS_MESSAGE);
    }

    #[test]
    fn other_status_carries_detail() {
        let err = interpret_response(StatusCode::UNAUTHORIZED, "bad key").unwrap_err();
        assert_eq!(
            err,
            CaptureError::UploadFailure("failed with status code: 401, response: bad key".into())
        );
        // Even other 2xx codes are failures.
        assert!(interpret_response(StatusCode::CREATED, "").is_err());
    }

    #[test]
    fn empty_label_rejected() {
        let path = temp_file_path("label.wav");
        fs::write(&path, b"RIFF").unwrap();
        let uploader = uploader_for("http://127.0.0.1:9/unused".into());
        assert!(matches!(
            uploader.upload(&path, "  ", "key"),
            Err(CaptureError::InvalidParameter(_))
        ));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_rejected() {
        let uploader = uploader_for("http://127.0.0.1:9/unused".into());
        assert!(matches!(
            uploader.upload(&temp_file_path("missing.wav"), "Rantai", "key"),
            Err(CaptureError::IoFailure(_))
        ));
    }

    #[test]
    fn posts_multipart_with_headers() {
        let path = temp_file_path("gear2.wav");
        fs::write(&path, b"RIFF-test-payload").unwrap();
        let (url, server) = serve_once("200 OK", "{\"success\":true}");

        let message = uploader_for(url).upload(&path, "Rantai", "ei_test_key").unwrap();
        assert_eq!(message, SUCCESS_MESSAGE);

        let request = server.join().unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /api/training/files"));
        assert!(lower.contains("x-api-key: ei_test_key"));
        assert!(lower.contains("x-label: rantai"));
        assert!(lower.contains("multipart/form-data"));
        assert!(request.contains("name=\"data\""));
        assert!(request.contains(&format!(
            "filename=\"{}\"",
            path.file_name().unwrap().to_string_lossy()
        )));
        assert!(request.contains("audio/wav"));
        assert!(request.contains("RIFF-test-payload"));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn server_error_is_upload_failure() {
        let path = temp_file_path("err.wav");
        fs::write(&path, b"RIFF").unwrap();
        let (url, server) = serve_once("500 Internal Server Error", "boom");

        let err = uploader_for(url).upload(&path, "Rantai", "key").unwrap_err();
        server.join().unwrap();
        assert_eq!(
            err,
            CaptureError::UploadFailure("failed with status code: 500, response: boom".into())
        );
        fs::remove_file(&path).ok();
    }

    #[test]
    fn unreachable_server_is_upload_failure() {
        let path = temp_file_path("down.wav");
        fs::write(&path, b"RIFF").unwrap();
        // Bind then drop to get a port with nothing listening.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let uploader = uploader_for(format!("http://127.0.0.1:{port}/"));
        assert!(matches!(
            uploader.upload(&path, "Rantai", "key"),
            Err(CaptureError::UploadFailure(_))
        ));
        fs::remove_file(&path).ok();
    }
}
