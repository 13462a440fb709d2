//! Interactive terminal loop driving the quiz/chat flow.
//!
//! The loop renders whatever the flow controller says is valid for the
//! current state: the initial quiz/chat choice, numbered button menus,
//! one-by-one question prompts, or free-text chat. Slash commands work from
//! any active mode: `/modo`, `/historico`, `/reiniciar`, `/sair`.

use anyhow::Result;
use logibots_core::flow::{FlowError, FlowState, Mode, QuizFlow};
use logibots_core::payload::ChoiceButton;
use logibots_core::question::{Question, QuizResult};
use logibots_core::transcript::{Role, Turn};
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Short pause before showing an assistant chat reply, so the conversation
/// reads at a human pace instead of appearing instantaneously.
const TYPING_DELAY: Duration = Duration::from_millis(600);

pub async fn run(mut flow: QuizFlow) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("LogiBots - assistente de estudos (/sair para encerrar)");
    if !flow.transcript().is_empty() {
        println!("--- conversa anterior restaurada ---");
        for turn in flow.transcript().turns() {
            print_turn(turn);
        }
        println!("------------------------------------");
    }
    let mut printed = flow.transcript().len();

    loop {
        match (flow.mode(), flow.state()) {
            (Mode::None, _) => {
                println!("O que você quer fazer?");
                println!("  1) Quiz guiado");
                println!("  2) Conversar com o assistente");
                let Some(line) = read_line(&mut lines, "> ")? else {
                    break;
                };
                match line.trim() {
                    "1" => flow.choose_quiz().await?,
                    "2" => flow.choose_chat().await?,
                    "/sair" => break,
                    other => {
                        println!("Opção desconhecida: '{other}'. Digite 1 ou 2.");
                        continue;
                    }
                }
            }
            (Mode::Chat, _) => {
                let Some(line) = read_line(&mut lines, "você: ")? else {
                    break;
                };
                match dispatch_command(&line, &mut flow).await? {
                    Dispatch::Quit => break,
                    Dispatch::Handled => {}
                    Dispatch::NotACommand => {
                        let text = line.trim();
                        if text.is_empty() {
                            continue;
                        }
                        flow.send_chat(text).await?;
                        tokio::time::sleep(TYPING_DELAY).await;
                    }
                }
            }
            (Mode::Quiz, FlowState::Levels) => {
                println!("Escolha o nível:");
                let Some(choice) = prompt_menu(&mut lines, flow.buttons(), "nível")? else {
                    break;
                };
                match choice {
                    MenuChoice::Command(line) => {
                        if let Dispatch::Quit = dispatch_command(&line, &mut flow).await? {
                            break;
                        }
                    }
                    MenuChoice::Button(button) => flow.pick_level(&button.title).await?,
                    MenuChoice::FreeText(text) => flow.pick_level(&text).await?,
                }
            }
            (Mode::Quiz, FlowState::Categories) => {
                println!("Escolha a categoria:");
                let Some(choice) = prompt_menu(&mut lines, flow.buttons(), "categoria")? else {
                    break;
                };
                match choice {
                    MenuChoice::Command(line) => {
                        if let Dispatch::Quit = dispatch_command(&line, &mut flow).await? {
                            break;
                        }
                    }
                    MenuChoice::Button(button) => flow.pick_category(&button).await?,
                    MenuChoice::FreeText(text) => {
                        // Button fetch degraded: build the payload the backend
                        // expects from what the user typed.
                        let button =
                            ChoiceButton::new(&text, format!(r#"{{"categoria":"{text}"}}"#));
                        flow.pick_category(&button).await?;
                    }
                }
            }
            (Mode::Quiz, FlowState::Subsubjects) => {
                println!("Escolha o subtópico:");
                let Some(choice) = prompt_menu(&mut lines, flow.buttons(), "subtópico")? else {
                    break;
                };
                match choice {
                    MenuChoice::Command(line) => {
                        if let Dispatch::Quit = dispatch_command(&line, &mut flow).await? {
                            break;
                        }
                    }
                    MenuChoice::Button(button) => flow.pick_subtopic(&button).await?,
                    MenuChoice::FreeText(text) => {
                        let button =
                            ChoiceButton::new(&text, format!(r#"{{"subtopico":"{text}"}}"#));
                        flow.pick_subtopic(&button).await?;
                    }
                }
            }
            (Mode::Quiz, FlowState::Questions) => {
                let Some(answers) = prompt_answers(&mut lines, flow.questions())? else {
                    break;
                };
                match flow.submit_answers(&answers).await {
                    Ok(()) => {}
                    Err(FlowError::IncompleteAnswers { expected }) => {
                        println!("Responda todas as {expected} questões antes de enviar.");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            (Mode::Quiz, FlowState::Results) => {
                if let Some(result) = flow.last_result() {
                    print_result(result);
                }
                println!("Digite 'continuar' para praticar mais, ou um comando (/modo, /historico, /reiniciar, /sair).");
                let Some(line) = read_line(&mut lines, "> ")? else {
                    break;
                };
                match dispatch_command(&line, &mut flow).await? {
                    Dispatch::Quit => break,
                    Dispatch::Handled => {}
                    Dispatch::NotACommand => {
                        if line.trim().eq_ignore_ascii_case("continuar") {
                            flow.continue_practicing().await?;
                        } else {
                            println!("Não entendi. Digite 'continuar' ou um comando.");
                        }
                    }
                }
            }
            // A quiz round always lands on one of the states above; anything
            // else means the flow was reset mid-round.
            (Mode::Quiz, _) => flow.reset(),
        }

        for turn in &flow.transcript().turns()[printed.min(flow.transcript().len())..] {
            print_turn(turn);
        }
        printed = flow.transcript().len();
    }

    println!("Até a próxima!");
    Ok(())
}

enum Dispatch {
    Quit,
    Handled,
    NotACommand,
}

async fn dispatch_command(line: &str, flow: &mut QuizFlow) -> Result<Dispatch> {
    match line.trim() {
        "/sair" => Ok(Dispatch::Quit),
        "/modo" => {
            flow.switch_mode().await?;
            Ok(Dispatch::Handled)
        }
        "/historico" => {
            print_history(flow);
            Ok(Dispatch::Handled)
        }
        "/reiniciar" => {
            flow.reset();
            Ok(Dispatch::Handled)
        }
        _ => Ok(Dispatch::NotACommand),
    }
}

enum MenuChoice {
    Button(ChoiceButton),
    FreeText(String),
    Command(String),
}

/// Shows a numbered button menu and reads one selection. With no buttons
/// (a degraded fetch) any typed text is accepted as the answer.
fn prompt_menu(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    buttons: &[ChoiceButton],
    what: &str,
) -> Result<Option<MenuChoice>> {
    for (i, button) in buttons.iter().enumerate() {
        println!("  {}) {}", i + 1, button.title);
    }
    if buttons.is_empty() {
        println!("  (sem opções disponíveis, digite o {what} desejado)");
    }
    loop {
        let Some(line) = read_line(lines, "> ")? else {
            return Ok(None);
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('/') {
            return Ok(Some(MenuChoice::Command(line)));
        }
        if buttons.is_empty() {
            return Ok(Some(MenuChoice::FreeText(trimmed.to_string())));
        }
        match parse_selection(trimmed, buttons.len()) {
            Some(index) => return Ok(Some(MenuChoice::Button(buttons[index].clone()))),
            None => println!("Escolha um número entre 1 e {}.", buttons.len()),
        }
    }
}

/// Prompts for one option per question; every slot must be filled before
/// the submission is attempted.
fn prompt_answers(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    questions: &[Question],
) -> Result<Option<Vec<String>>> {
    let mut answers = Vec::with_capacity(questions.len());
    for (i, question) in questions.iter().enumerate() {
        println!();
        println!("Questão {}/{}: {}", i + 1, questions.len(), question.question);
        for (j, option) in question.options.iter().enumerate() {
            let letter = Question::letter_for(j).unwrap_or('?');
            println!("  {letter}) {option}");
        }
        loop {
            let Some(line) = read_line(lines, "resposta: ")? else {
                return Ok(None);
            };
            match parse_option(&line, &question.options) {
                Some(option) => {
                    answers.push(option);
                    break;
                }
                None => println!("Resposta inválida. Use a letra ou o número da alternativa."),
            }
        }
    }
    Ok(Some(answers))
}

/// `"2"` → second option; `"b"`/`"B"` → second option; otherwise `None`.
fn parse_option(input: &str, options: &[String]) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<usize>() {
        return options.get(n.checked_sub(1)?).cloned();
    }
    let c = trimmed.chars().next()?.to_ascii_lowercase();
    if c.is_ascii_alphabetic() {
        return options.get((c as u8 - b'a') as usize).cloned();
    }
    None
}

/// 1-based menu input to a 0-based index, bounds-checked.
fn parse_selection(input: &str, len: usize) -> Option<usize> {
    let n = input.trim().parse::<usize>().ok()?;
    if (1..=len).contains(&n) { Some(n - 1) } else { None }
}

fn read_line(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    prompt: &str,
) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?)),
        None => Ok(None),
    }
}

fn print_turn(turn: &Turn) {
    match turn.role {
        Role::User => println!("você: {}", turn.content),
        Role::Assistant => println!("logibots: {}", turn.content),
    }
}

fn print_result(result: &QuizResult) {
    println!();
    println!(
        "Resultado: {} certas, {} erradas de {}.",
        result.total_correct_answers,
        result.total_wrong_answers,
        result.total()
    );
    for detail in &result.details.questions {
        println!("- {}", detail.question);
        println!("  sua resposta: {}", detail.selected_option);
        println!("  correta: {}", detail.correct_option);
        println!("  {}", detail.explanation);
    }
}

fn print_history(flow: &QuizFlow) {
    if flow.history().is_empty() {
        println!("Nenhuma tentativa concluída ainda.");
        return;
    }
    for (i, (questions, result)) in flow.history().attempts().enumerate() {
        println!(
            "Tentativa {}: {} questões, {} certas, {} erradas.",
            i + 1,
            questions.len(),
            result.total_correct_answers,
            result.total_wrong_answers
        );
    }
}
