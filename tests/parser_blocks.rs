// tests/parser_blocks.rs
use edi_log_pipeline::parser::{parse_document, parse_file, SEPARATOR_LINE};

#[test]
fn two_block_document_yields_only_complete_blocks() {
    let doc = format!(
        "Data:    01/01/2024 10:00:00\n\
         Formato do Processo de EDI:    Upload de FTP\n\
         Nome do Arquivo:    A.txt\n\
         Nome do Arquivo:    B.txt\n\
         {SEPARATOR_LINE}\n\
         Formato do Processo de EDI:    Envio de e-mail por SMTP\n\
         Nome do Arquivo:    C.txt\n"
    );

    let records = parse_document(&doc);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].file_name, "A.txt");
    assert_eq!(records[1].file_name, "B.txt");
    for r in &records {
        assert_eq!(r.timestamp, "01/01/2024 10:00:00");
        assert_eq!(r.process_format, "Upload de FTP");
    }
}

#[test]
fn realistic_gateway_log_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("ConsoleEDI_20240101.Log");
    let doc = format!(
        "Inicio do processamento\n\
         Data:    05/03/2024 08:15:42\n\
         Formato do Processo de EDI:    Upload de FTP\n\
         Servidor:    edi.gateway.local\n\
         Nome do Arquivo:    NFE_000123.xml\n\
         {SEPARATOR_LINE}\n\
         Data:    05/03/2024 08:16:01\n\
         Formato do Processo de EDI:    Consulta de Status\n\
         Nome do Arquivo:    STATUS_000124.xml\n\
         {SEPARATOR_LINE}\n\
         Data:    05/03/2024 08:17:09\n\
         Formato do Processo de EDI:    Envio de e-mail por SMTP\n\
         Nome do Arquivo:    AVISO_000125.pdf\n\
         Nome do Arquivo:    AVISO_000125.xml\n"
    );
    std::fs::write(&log, doc).unwrap();

    let records = parse_file(&log).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].file_name, "NFE_000123.xml");
    assert_eq!(records[3].process_format, "Envio de e-mail por SMTP");
}
